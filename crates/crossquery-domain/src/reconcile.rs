//! Posting-status reconciliation.
//!
//! A time entry counts as posted when at least one billing item of a
//! qualifying type references it. The reconciler builds the posted-ID set
//! from a fresh ledger lookup over the candidates and then partitions the
//! candidates locally; no further requests are made for the partition.

use std::collections::HashSet;
use std::sync::Arc;

use crossquery_client::{FilterCondition, QueryClient, Record};
use tracing::{debug, instrument};

use crate::error::QueryResult;
use crate::lookup::{distinct_keys, int_field, record_id, BatchedLookup, LookupRequest};
use crate::request::PostingStatus;
use crate::schema;

/// Candidates split by posting status. Together they are exactly the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub posted: Vec<Record>,
    pub unposted: Vec<Record>,
}

impl Reconciliation {
    /// Splits `candidates` by membership in `posted_ids`, preserving order.
    pub fn partition(candidates: Vec<Record>, posted_ids: &HashSet<i64>) -> QueryResult<Self> {
        let mut reconciliation = Self::default();
        for record in candidates {
            if posted_ids.contains(&record_id(&record, schema::TIME_ENTRIES)?) {
                reconciliation.posted.push(record);
            } else {
                reconciliation.unposted.push(record);
            }
        }
        Ok(reconciliation)
    }

    pub fn select(self, status: PostingStatus) -> Vec<Record> {
        match status {
            PostingStatus::Posted => self.posted,
            PostingStatus::Unposted => self.unposted,
        }
    }
}

/// Determines which candidate time entries have a qualifying ledger entry.
pub struct PostingReconciler<C: ?Sized> {
    lookup: Arc<BatchedLookup<C>>,
    ledger_types: Vec<i64>,
}

impl<C> PostingReconciler<C>
where
    C: QueryClient + ?Sized,
{
    pub fn new(lookup: Arc<BatchedLookup<C>>, ledger_types: Vec<i64>) -> Self {
        Self {
            lookup,
            ledger_types,
        }
    }

    /// Returns the identifiers among `candidates` with a qualifying billing item.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn posted_ids(&self, candidates: &[Record]) -> QueryResult<HashSet<i64>> {
        let candidate_ids = distinct_keys(candidates, schema::TIME_ENTRIES, schema::ID)?;
        let request = LookupRequest::new(schema::BILLING_ITEMS, candidate_ids.clone())
            .with_key_field(schema::TIME_ENTRY_ID)
            .with_filter(FilterCondition::in_set(
                schema::BILLING_ITEM_TYPE,
                self.ledger_types.iter().copied(),
            ))
            .with_fields(&[schema::TIME_ENTRY_ID]);

        let candidate_ids: HashSet<i64> = candidate_ids.into_iter().collect();
        let mut posted = HashSet::new();
        for item in self.lookup.fetch(&request).await? {
            if let Some(entry) = int_field(&item, schema::BILLING_ITEMS, schema::TIME_ENTRY_ID)? {
                if candidate_ids.contains(&entry) {
                    posted.insert(entry);
                }
            }
        }

        debug!(posted = posted.len(), "ledger reconciled");
        Ok(posted)
    }

    pub async fn reconcile(&self, candidates: Vec<Record>) -> QueryResult<Reconciliation> {
        let posted = self.posted_ids(&candidates).await?;
        Reconciliation::partition(candidates, &posted)
    }
}
