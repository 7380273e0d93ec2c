//! Batched-ID lookup against related entity types.
//!
//! This is the only place that combines batching with pagination: the ID
//! set is partitioned to respect the remote OR-clause limit, batches run
//! through the bounded runner, and each batch follows its own cursor to
//! exhaustion before it counts as complete.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crossquery_client::{FilterCondition, QueryClient, Record};
use tracing::{debug, instrument};

use crate::batch::{partition, run_bounded};
use crate::config::EngineConfig;
use crate::error::{QueryError, QueryResult};
use crate::schema;

/// Transient foreign-key → resolved-value map built for one filter stage.
pub type LookupIndex = HashMap<i64, i64>;

/// A lookup of related records by identifier.
#[derive(Debug, Clone)]
pub struct LookupRequest {
    /// Entity type to query.
    pub entity: String,
    /// Field matched against `ids` (defaults to `id`).
    pub key_field: String,
    /// Distinct identifiers to resolve.
    pub ids: Vec<i64>,
    /// Extra conditions ANDed with the membership condition.
    pub filters: Vec<FilterCondition>,
    /// Fields to return; keep this minimal.
    pub fields: Vec<String>,
}

impl LookupRequest {
    pub fn new(entity: &str, ids: Vec<i64>) -> Self {
        Self {
            entity: entity.to_string(),
            key_field: schema::ID.to_string(),
            ids,
            filters: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_key_field(mut self, key_field: &str) -> Self {
        self.key_field = key_field.to_string();
        self
    }

    pub fn with_filter(mut self, condition: FilterCondition) -> Self {
        self.filters.push(condition);
        self
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }
}

/// Executes [`LookupRequest`]s in API-legal batches with bounded concurrency.
pub struct BatchedLookup<C: ?Sized> {
    client: Arc<C>,
    max_batch_size: usize,
    max_concurrency: usize,
}

impl<C> BatchedLookup<C>
where
    C: QueryClient + ?Sized,
{
    pub fn new(client: Arc<C>, config: &EngineConfig) -> Self {
        Self {
            client,
            max_batch_size: config.max_batch_size,
            max_concurrency: config.max_concurrency,
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Returns the union of matching records across all batches and pages.
    ///
    /// An empty ID list returns immediately without a request.
    #[instrument(skip(self, request), fields(entity = %request.entity, ids = request.ids.len()))]
    pub async fn fetch(&self, request: &LookupRequest) -> QueryResult<Vec<Record>> {
        if request.ids.is_empty() {
            return Ok(Vec::new());
        }

        let batches = partition(&request.ids, self.max_batch_size);
        debug!(batches = batches.len(), "dispatching lookup batches");

        let per_batch = run_bounded(batches, self.max_concurrency, |batch| {
            self.fetch_batch(request, batch)
        })
        .await?;

        Ok(per_batch.into_iter().flatten().collect())
    }

    async fn fetch_batch(&self, request: &LookupRequest, batch: Vec<i64>) -> QueryResult<Vec<Record>> {
        let mut filters = Vec::with_capacity(request.filters.len() + 1);
        filters.push(FilterCondition::in_set(request.key_field.as_str(), batch));
        filters.extend(request.filters.iter().cloned());

        let mut page = self
            .client
            .query(&request.entity, &filters, &request.fields)
            .await?;
        let mut records = std::mem::take(&mut page.records);
        let mut pages = 1usize;

        while let Some(cursor) = page.next_cursor.take() {
            page = self.client.advance(&cursor).await?;
            records.append(&mut page.records);
            pages += 1;
        }

        debug!(records = records.len(), pages, "lookup batch complete");
        Ok(records)
    }
}

/// Collects the distinct non-null values of an integer field, in ascending order.
pub fn distinct_keys<'a, I>(records: I, entity: &str, field: &str) -> QueryResult<Vec<i64>>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut keys = BTreeSet::new();
    for record in records {
        if let Some(key) = int_field(record, entity, field)? {
            keys.insert(key);
        }
    }
    Ok(keys.into_iter().collect())
}

/// Maps each record's `key_field` to its `value_field`, skipping records where either is null.
pub fn build_index(
    records: &[Record],
    entity: &str,
    key_field: &str,
    value_field: &str,
) -> QueryResult<LookupIndex> {
    let mut index = LookupIndex::with_capacity(records.len());
    for record in records {
        let key = int_field(record, entity, key_field)?;
        let value = int_field(record, entity, value_field)?;
        if let (Some(key), Some(value)) = (key, value) {
            index.insert(key, value);
        }
    }
    Ok(index)
}

pub(crate) fn int_field(record: &Record, entity: &str, field: &str) -> QueryResult<Option<i64>> {
    record
        .int_field(field)
        .map_err(|e| QueryError::from_field(entity, e))
}

pub(crate) fn record_id(record: &Record, entity: &str) -> QueryResult<i64> {
    record.id().map_err(|e| QueryError::from_field(entity, e))
}
