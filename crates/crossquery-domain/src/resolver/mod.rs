//! Cross-entity filter resolver.
//!
//! Narrows a candidate set of time entries through a fixed sequence of
//! independent stages. Each stage collects the distinct foreign keys of the
//! candidates, resolves them against the related entity with the stage's own
//! conditions attached, and keeps only the candidates that resolved.
//!
//! Stage rules:
//!
//! - An absent or empty selection skips its stage entirely.
//! - A present selection that resolves nothing removes every candidate that
//!   relies on it ("filter matched nothing" is not "no filter").
//! - Stages never add candidates.
//! - Ticket status, queue and due date share one ticket lookup.

mod ownership;
mod types;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use crossquery_client::{FilterCondition, QueryClient, Record};
use tracing::{debug, instrument};

use crate::error::{QueryError, QueryResult};
use crate::lookup::{distinct_keys, int_field, record_id, BatchedLookup, LookupRequest};
use crate::schema;

pub use ownership::{Ownership, OwnershipHop, OwnershipIndex};
pub use types::{DueDateWindow, Explicit, FilterSelections};

/// A narrowing stage, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ContractType,
    Ticket,
    TaskStatus,
    AccountManager,
}

impl Stage {
    pub const PIPELINE: [Stage; 4] = [
        Stage::ContractType,
        Stage::Ticket,
        Stage::TaskStatus,
        Stage::AccountManager,
    ];

    pub fn is_active(self, selections: &FilterSelections) -> bool {
        match self {
            Self::ContractType => selections.contract_type.is_some(),
            Self::Ticket => selections.ticket_stage_active(),
            Self::TaskStatus => !selections.task_statuses.is_empty(),
            Self::AccountManager => selections.account_manager.is_some(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ContractType => "contract_type",
            Self::Ticket => "ticket",
            Self::TaskStatus => "task_status",
            Self::AccountManager => "account_manager",
        };
        f.write_str(name)
    }
}

/// Applies [`FilterSelections`] to candidate time entries.
pub struct FilterResolver<C: ?Sized> {
    lookup: Arc<BatchedLookup<C>>,
}

impl<C> FilterResolver<C>
where
    C: QueryClient + ?Sized,
{
    pub fn new(lookup: Arc<BatchedLookup<C>>) -> Self {
        Self { lookup }
    }

    /// Runs every active stage in order and returns the surviving candidates.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn resolve(
        &self,
        candidates: Vec<Record>,
        selections: &FilterSelections,
    ) -> QueryResult<Vec<Record>> {
        let mut candidates = candidates;
        for stage in Stage::PIPELINE {
            if candidates.is_empty() {
                break;
            }
            if !stage.is_active(selections) {
                continue;
            }
            let before = candidates.len();
            candidates = self.apply(stage, candidates, selections).await?;
            debug!(%stage, before, after = candidates.len(), "stage applied");
        }
        Ok(candidates)
    }

    /// Applies a single stage, regardless of whether its selection is set.
    pub async fn apply(
        &self,
        stage: Stage,
        candidates: Vec<Record>,
        selections: &FilterSelections,
    ) -> QueryResult<Vec<Record>> {
        match stage {
            Stage::ContractType => match selections.contract_type {
                Some(contract_type) => self.by_contract_type(candidates, contract_type).await,
                None => Ok(candidates),
            },
            Stage::Ticket => self.by_ticket(candidates, selections).await,
            Stage::TaskStatus => self.by_task_status(candidates, &selections.task_statuses).await,
            Stage::AccountManager => match selections.account_manager {
                Some(resource) => self.by_account_manager(candidates, resource).await,
                None => Ok(candidates),
            },
        }
    }

    async fn by_contract_type(&self, candidates: Vec<Record>, contract_type: i64) -> QueryResult<Vec<Record>> {
        let keys = distinct_keys(&candidates, schema::TIME_ENTRIES, schema::CONTRACT_ID)?;
        let request = LookupRequest::new(schema::CONTRACTS, keys)
            .with_filter(FilterCondition::eq(schema::CONTRACT_TYPE, contract_type))
            .with_fields(&[schema::ID]);
        let matched = self.resolved_ids(&request).await?;
        retain_resolved(candidates, schema::CONTRACT_ID, &matched)
    }

    async fn by_ticket(&self, candidates: Vec<Record>, selections: &FilterSelections) -> QueryResult<Vec<Record>> {
        if !selections.ticket_stage_active() {
            return Ok(candidates);
        }

        let keys = distinct_keys(&candidates, schema::TIME_ENTRIES, schema::TICKET_ID)?;
        let mut request = LookupRequest::new(schema::TICKETS, keys).with_fields(&[schema::DUE_DATE_TIME]);
        if !selections.ticket_statuses.is_empty() {
            request = request.with_filter(FilterCondition::in_set(
                schema::STATUS,
                selections.ticket_statuses.iter().copied(),
            ));
        }
        if let Some(queue) = selections.ticket_queue {
            request = request.with_filter(FilterCondition::eq(schema::QUEUE_ID, queue));
        }

        // Undated tickets cannot be expressed alongside a date range on the
        // remote (no OR across fields), so the window is applied here.
        let window = &selections.ticket_due;
        let mut matched = HashSet::new();
        for ticket in self.lookup.fetch(&request).await? {
            if window.admits(due_date(&ticket)?) {
                matched.insert(record_id(&ticket, schema::TICKETS)?);
            }
        }
        retain_resolved(candidates, schema::TICKET_ID, &matched)
    }

    async fn by_task_status(&self, candidates: Vec<Record>, statuses: &[i64]) -> QueryResult<Vec<Record>> {
        if statuses.is_empty() {
            return Ok(candidates);
        }
        let keys = distinct_keys(&candidates, schema::TIME_ENTRIES, schema::TASK_ID)?;
        let request = LookupRequest::new(schema::TASKS, keys)
            .with_filter(FilterCondition::in_set(schema::STATUS, statuses.iter().copied()))
            .with_fields(&[schema::ID]);
        let matched = self.resolved_ids(&request).await?;
        retain_resolved(candidates, schema::TASK_ID, &matched)
    }

    async fn by_account_manager(&self, candidates: Vec<Record>, resource: i64) -> QueryResult<Vec<Record>> {
        let index = OwnershipIndex::build(self.lookup.as_ref(), &candidates).await?;

        let mut owned = Vec::with_capacity(candidates.len());
        let mut companies = HashSet::new();
        for record in candidates {
            let ownership = index.ownership(&record)?;
            if let Ownership::Company(company) = ownership {
                companies.insert(company);
            }
            owned.push((record, ownership));
        }

        let mut company_ids: Vec<i64> = companies.into_iter().collect();
        company_ids.sort_unstable();
        let request = LookupRequest::new(schema::COMPANIES, company_ids)
            .with_filter(FilterCondition::eq(schema::OWNER_RESOURCE_ID, resource))
            .with_fields(&[schema::ID]);
        let managed = self.resolved_ids(&request).await?;

        Ok(owned
            .into_iter()
            .filter(|(_, ownership)| match ownership {
                Ownership::Unrelated => true,
                Ownership::Unresolved => false,
                Ownership::Company(company) => managed.contains(company),
            })
            .map(|(record, _)| record)
            .collect())
    }

    async fn resolved_ids(&self, request: &LookupRequest) -> QueryResult<HashSet<i64>> {
        self.lookup
            .fetch(request)
            .await?
            .iter()
            .map(|record| record_id(record, &request.entity))
            .collect()
    }
}

/// Keeps candidates whose `foreign_key` is set and among `resolved`.
fn retain_resolved(candidates: Vec<Record>, foreign_key: &str, resolved: &HashSet<i64>) -> QueryResult<Vec<Record>> {
    let mut kept = Vec::with_capacity(candidates.len());
    for record in candidates {
        if let Some(key) = int_field(&record, schema::TIME_ENTRIES, foreign_key)? {
            if resolved.contains(&key) {
                kept.push(record);
            }
        }
    }
    Ok(kept)
}

fn due_date(ticket: &Record) -> QueryResult<Option<DateTime<Utc>>> {
    let raw = ticket
        .str_field(schema::DUE_DATE_TIME)
        .map_err(|e| QueryError::from_field(schema::TICKETS, e))?;
    raw.map(|value| {
        DateTime::parse_from_rfc3339(value)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|e| QueryError::MalformedRecord {
                entity: schema::TICKETS.to_string(),
                field: schema::DUE_DATE_TIME.to_string(),
                message: format!("'{value}' is not an RFC 3339 timestamp: {e}"),
            })
    })
    .transpose()
}
