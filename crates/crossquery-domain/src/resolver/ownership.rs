//! Ownership chain: maps each time entry to the company it belongs to.
//!
//! Two hops lead to a company: `ticket → company` and
//! `task → project → company`. Each hop builds its own [`LookupIndex`] from
//! the foreign keys assigned to it; a record is assigned to the first hop in
//! [`OwnershipHop::CHAIN`] whose foreign key it carries.

use std::collections::HashMap;

use crossquery_client::{QueryClient, Record};
use tracing::debug;

use crate::error::QueryResult;
use crate::lookup::{build_index, distinct_keys, int_field, BatchedLookup, LookupIndex, LookupRequest};
use crate::schema;

/// One way of reaching a company from a time entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnershipHop {
    /// `ticketID → Tickets.companyID`
    Ticket,
    /// `taskID → Tasks.projectID → Projects.companyID`
    Task,
}

impl OwnershipHop {
    /// Hops in the order they are tried for each record.
    pub const CHAIN: [OwnershipHop; 2] = [OwnershipHop::Ticket, OwnershipHop::Task];

    pub fn foreign_key(self) -> &'static str {
        match self {
            Self::Ticket => schema::TICKET_ID,
            Self::Task => schema::TASK_ID,
        }
    }

    /// Resolves `keys` of this hop to company identifiers.
    pub async fn build_index<C>(self, lookup: &BatchedLookup<C>, keys: Vec<i64>) -> QueryResult<LookupIndex>
    where
        C: QueryClient + ?Sized,
    {
        match self {
            Self::Ticket => {
                let request = LookupRequest::new(schema::TICKETS, keys).with_fields(&[schema::COMPANY_ID]);
                let tickets = lookup.fetch(&request).await?;
                build_index(&tickets, schema::TICKETS, schema::ID, schema::COMPANY_ID)
            }
            Self::Task => {
                let request = LookupRequest::new(schema::TASKS, keys).with_fields(&[schema::PROJECT_ID]);
                let tasks = lookup.fetch(&request).await?;
                let task_to_project = build_index(&tasks, schema::TASKS, schema::ID, schema::PROJECT_ID)?;

                let mut project_ids: Vec<i64> = task_to_project.values().copied().collect();
                project_ids.sort_unstable();
                project_ids.dedup();

                let request =
                    LookupRequest::new(schema::PROJECTS, project_ids).with_fields(&[schema::COMPANY_ID]);
                let projects = lookup.fetch(&request).await?;
                let project_to_company =
                    build_index(&projects, schema::PROJECTS, schema::ID, schema::COMPANY_ID)?;

                Ok(task_to_project
                    .into_iter()
                    .filter_map(|(task, project)| {
                        project_to_company.get(&project).map(|company| (task, *company))
                    })
                    .collect())
            }
        }
    }
}

/// Where a record's ownership chain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The record carries none of the chain's foreign keys.
    Unrelated,
    /// A hop applied but did not reach a company.
    Unresolved,
    Company(i64),
}

/// Per-hop lookup indexes for one candidate set.
#[derive(Debug, Default)]
pub struct OwnershipIndex {
    indexes: HashMap<OwnershipHop, LookupIndex>,
}

impl OwnershipIndex {
    /// Builds the index of every hop that at least one candidate uses.
    pub async fn build<C>(lookup: &BatchedLookup<C>, candidates: &[Record]) -> QueryResult<Self>
    where
        C: QueryClient + ?Sized,
    {
        let mut assigned: HashMap<OwnershipHop, Vec<&Record>> = HashMap::new();
        for record in candidates {
            if let Some(hop) = first_applicable_hop(record)? {
                assigned.entry(hop).or_default().push(record);
            }
        }

        let mut indexes = HashMap::new();
        for hop in OwnershipHop::CHAIN {
            let Some(records) = assigned.remove(&hop) else {
                continue;
            };
            let keys = distinct_keys(records, schema::TIME_ENTRIES, hop.foreign_key())?;
            let index = hop.build_index(lookup, keys).await?;
            debug!(?hop, resolved = index.len(), "ownership hop indexed");
            indexes.insert(hop, index);
        }
        Ok(Self { indexes })
    }

    pub fn ownership(&self, record: &Record) -> QueryResult<Ownership> {
        for hop in OwnershipHop::CHAIN {
            if let Some(key) = int_field(record, schema::TIME_ENTRIES, hop.foreign_key())? {
                let company = self.indexes.get(&hop).and_then(|index| index.get(&key));
                return Ok(company.map_or(Ownership::Unresolved, |c| Ownership::Company(*c)));
            }
        }
        Ok(Ownership::Unrelated)
    }
}

fn first_applicable_hop(record: &Record) -> QueryResult<Option<OwnershipHop>> {
    for hop in OwnershipHop::CHAIN {
        if int_field(record, schema::TIME_ENTRIES, hop.foreign_key())?.is_some() {
            return Ok(Some(hop));
        }
    }
    Ok(None)
}
