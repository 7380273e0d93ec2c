//! In-memory query client for testing and local runs.
//!
//! Mirrors the per-request limits of the remote API (page size, maximum
//! values per `in` condition, mandatory filter) so that code exercised
//! against it respects the same constraints it will meet in production.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{ClientError, ClientResult};
use crate::traits::{Cursor, FilterCondition, FilterOp, Page, QueryClient, Record};

/// Default remote page size.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Default maximum number of values in one `in` condition.
pub const DEFAULT_MAX_IN_VALUES: usize = 500;

/// Default number of unconsumed cursors kept before the oldest is evicted.
pub const DEFAULT_MAX_PENDING: usize = 1024;

/// Default lifetime of an unconsumed cursor.
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(300);

/// Remaining results of a query awaiting `advance`.
#[derive(Debug)]
struct PendingQuery {
    entity: String,
    records: Vec<Record>,
    offset: usize,
    seq: u64,
    created_at: Instant,
}

/// In-memory implementation of [`QueryClient`].
///
/// Query results are snapshotted when the query is issued; cursors are
/// single-use, as they are on the remote. Cursors that are never advanced
/// expire after the pending TTL, and at most `max_pending` are retained.
#[derive(Debug)]
pub struct MemoryQueryClient {
    tables: DashMap<String, Vec<Record>>,
    pending: DashMap<String, PendingQuery>,
    failures: DashMap<String, String>,
    page_size: usize,
    max_in_values: usize,
    max_pending: usize,
    pending_ttl: Duration,
    latency: Option<Duration>,
    next_cursor: AtomicU64,
    requests: DashMap<String, usize>,
    advances: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for MemoryQueryClient {
    fn default() -> Self {
        Self {
            tables: DashMap::new(),
            pending: DashMap::new(),
            failures: DashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            max_in_values: DEFAULT_MAX_IN_VALUES,
            max_pending: DEFAULT_MAX_PENDING,
            pending_ttl: DEFAULT_PENDING_TTL,
            latency: None,
            next_cursor: AtomicU64::new(1),
            requests: DashMap::new(),
            advances: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }
}

/// Decrements the in-flight counter when a request completes or is dropped.
struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryQueryClient {
    /// Creates an empty client with the remote's default limits.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_in_values(mut self, max_in_values: usize) -> Self {
        self.max_in_values = max_in_values.max(1);
        self
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = ttl;
        self
    }

    /// Delays every request, which makes overlapping requests observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Appends records to an entity table.
    pub fn insert(&self, entity: &str, records: impl IntoIterator<Item = Record>) {
        self.tables
            .entry(entity.to_string())
            .or_default()
            .extend(records);
    }

    /// Appends records given as a JSON array of objects.
    pub fn insert_json(&self, entity: &str, rows: Value) -> ClientResult<()> {
        let Value::Array(rows) = rows else {
            return Err(ClientError::MalformedResponse {
                message: format!("expected an array of rows for entity '{entity}'"),
            });
        };
        let records = rows
            .into_iter()
            .map(Record::from_value)
            .collect::<ClientResult<Vec<_>>>()?;
        self.insert(entity, records);
        Ok(())
    }

    /// Makes every subsequent request against `entity` fail with a transport error.
    pub fn fail_entity(&self, entity: &str, message: &str) {
        self.failures
            .insert(entity.to_string(), message.to_string());
    }

    /// Number of requests (queries and page advances) served for `entity`.
    pub fn request_count(&self, entity: &str) -> usize {
        self.requests.get(entity).map(|c| *c).unwrap_or(0)
    }

    /// Number of page advances served across all entities.
    pub fn advance_count(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }

    /// Requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Cursors issued but not yet advanced or evicted.
    pub fn pending_cursors(&self) -> usize {
        self.pending.len()
    }

    /// Highest number of requests that were in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self, entity: &str) -> InFlightGuard<'_> {
        *self.requests.entry(entity.to_string()).or_insert(0) += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            counter: &self.in_flight,
        }
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_failure(&self, entity: &str) -> ClientResult<()> {
        match self.failures.get(entity) {
            Some(message) => Err(ClientError::Transport {
                message: message.value().clone(),
            }),
            None => Ok(()),
        }
    }

    fn validate_filters(&self, entity: &str, filters: &[FilterCondition]) -> ClientResult<()> {
        if filters.is_empty() {
            return Err(ClientError::Rejected {
                entity: entity.to_string(),
                message: "at least one filter condition is required".to_string(),
            });
        }
        for condition in filters {
            match (&condition.op, &condition.value) {
                (FilterOp::In, Value::Array(values)) if values.is_empty() => {
                    return Err(ClientError::InvalidFilter {
                        message: format!("'in' condition on '{}' has no values", condition.field),
                    });
                }
                (FilterOp::In, Value::Array(_)) => {}
                (FilterOp::In, _) => {
                    return Err(ClientError::InvalidFilter {
                        message: format!("'in' condition on '{}' requires an array", condition.field),
                    });
                }
                _ => {}
            }
            let count = condition.or_clause_count();
            if count > self.max_in_values {
                return Err(ClientError::InvalidFilter {
                    message: format!(
                        "'in' condition on '{}' has {} values, maximum is {}",
                        condition.field, count, self.max_in_values
                    ),
                });
            }
        }
        Ok(())
    }

    /// Drops expired cursors, then the oldest ones until there is room for one more.
    fn evict_pending(&self) {
        let ttl = self.pending_ttl;
        self.pending
            .retain(|_, pending| pending.created_at.elapsed() < ttl);

        while self.pending.len() >= self.max_pending {
            let oldest = self
                .pending
                .iter()
                .min_by_key(|entry| entry.value().seq)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(token) => {
                    debug!(cursor = %token, "evicting unconsumed cursor");
                    self.pending.remove(&token);
                }
                None => break,
            }
        }
    }

    /// Splits off one page and parks the remainder under a fresh cursor.
    fn paginate(&self, entity: &str, records: Vec<Record>, offset: usize) -> Page {
        let end = (offset + self.page_size).min(records.len());
        let page_records = records[offset..end].to_vec();
        let next_cursor = if end < records.len() {
            self.evict_pending();
            let seq = self.next_cursor.fetch_add(1, Ordering::SeqCst);
            let token = format!("c{seq}");
            self.pending.insert(
                token.clone(),
                PendingQuery {
                    entity: entity.to_string(),
                    records,
                    offset: end,
                    seq,
                    created_at: Instant::now(),
                },
            );
            Some(Cursor::new(token))
        } else {
            None
        };
        Page {
            records: page_records,
            next_cursor,
        }
    }
}

#[async_trait]
impl QueryClient for MemoryQueryClient {
    #[instrument(skip(self, filters, fields), fields(filters = filters.len()))]
    async fn query(
        &self,
        entity: &str,
        filters: &[FilterCondition],
        fields: &[String],
    ) -> ClientResult<Page> {
        let _guard = self.enter(entity);
        self.simulate_latency().await;
        self.check_failure(entity)?;
        self.validate_filters(entity, filters)?;

        let matched: Vec<Record> = self
            .tables
            .get(entity)
            .map(|table| {
                table
                    .iter()
                    .filter(|record| filters.iter().all(|c| matches(record, c)))
                    .map(|record| record.project(fields))
                    .collect()
            })
            .unwrap_or_default();

        debug!(entity, matched = matched.len(), "memory query");
        Ok(self.paginate(entity, matched, 0))
    }

    #[instrument(skip(self), fields(cursor = %cursor))]
    async fn advance(&self, cursor: &Cursor) -> ClientResult<Page> {
        let (_, pending) =
            self.pending
                .remove(cursor.as_str())
                .ok_or_else(|| ClientError::UnknownCursor {
                    cursor: cursor.to_string(),
                })?;
        let _guard = self.enter(&pending.entity);
        self.advances.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_failure(&pending.entity)?;

        Ok(self.paginate(&pending.entity, pending.records, pending.offset))
    }
}

/// Evaluates one condition against a record.
fn matches(record: &Record, condition: &FilterCondition) -> bool {
    let field = record.get(&condition.field);
    match condition.op {
        FilterOp::Exists => field.is_some(),
        FilterOp::Eq => field.is_some_and(|v| compare(v, &condition.value) == Some(CmpOrdering::Equal)),
        FilterOp::In => match (&condition.value, field) {
            (Value::Array(values), Some(v)) => values
                .iter()
                .any(|candidate| compare(v, candidate) == Some(CmpOrdering::Equal)),
            _ => false,
        },
        FilterOp::Gte => field.is_some_and(|v| {
            matches!(
                compare(v, &condition.value),
                Some(CmpOrdering::Greater | CmpOrdering::Equal)
            )
        }),
        FilterOp::Lte => field.is_some_and(|v| {
            matches!(
                compare(v, &condition.value),
                Some(CmpOrdering::Less | CmpOrdering::Equal)
            )
        }),
    }
}

/// Orders numbers numerically and strings lexically (ISO-8601 dates sort correctly).
fn compare(left: &Value, right: &Value) -> Option<CmpOrdering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client_with_rows(page_size: usize, count: i64) -> MemoryQueryClient {
        let client = MemoryQueryClient::new().with_page_size(page_size);
        let rows: Vec<Value> = (1..=count)
            .map(|id| json!({ "id": id, "status": id % 3, "name": format!("row-{id}") }))
            .collect();
        client.insert_json("Tickets", Value::Array(rows)).unwrap();
        client
    }

    #[tokio::test]
    async fn test_query_follows_cursor_until_exhausted() {
        let client = client_with_rows(4, 10);
        let filters = [FilterCondition::exists("id")];

        let mut page = client.query("Tickets", &filters, &[]).await.unwrap();
        let mut seen = page.records.len();
        let mut pages = 1;
        while let Some(cursor) = page.next_cursor.clone() {
            page = client.advance(&cursor).await.unwrap();
            seen += page.records.len();
            pages += 1;
        }

        assert_eq!(seen, 10);
        assert_eq!(pages, 3);
        assert_eq!(client.advance_count(), 2);
        assert_eq!(client.request_count("Tickets"), 3);
    }

    #[tokio::test]
    async fn test_cursor_is_single_use() {
        let client = client_with_rows(2, 5);
        let page = client
            .query("Tickets", &[FilterCondition::exists("id")], &[])
            .await
            .unwrap();
        let cursor = page.next_cursor.unwrap();

        client.advance(&cursor).await.unwrap();
        let err = client.advance(&cursor).await.unwrap_err();
        assert!(matches!(err, ClientError::UnknownCursor { .. }));
    }

    #[tokio::test]
    async fn test_unfiltered_query_is_rejected() {
        let client = client_with_rows(10, 3);
        let err = client.query("Tickets", &[], &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_in_condition_over_limit_is_invalid() {
        let client = client_with_rows(10, 3).with_max_in_values(2);
        let err = client
            .query("Tickets", &[FilterCondition::in_set("id", [1, 2, 3])], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidFilter { .. }));
    }

    #[tokio::test]
    async fn test_operators_and_projection() {
        let client = client_with_rows(100, 9);
        let page = client
            .query(
                "Tickets",
                &[
                    FilterCondition::in_set("status", [0, 1]),
                    FilterCondition::gte("id", 3),
                    FilterCondition::lte("id", 7),
                ],
                &["status".to_string()],
            )
            .await
            .unwrap();

        let ids: Vec<i64> = page.records.iter().map(|r| r.id().unwrap()).collect();
        assert_eq!(ids, vec![3, 4, 6, 7]);
        assert!(page.records.iter().all(|r| r.get("name").is_none()));
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_failure_injection_returns_transport_error() {
        let client = client_with_rows(10, 3);
        client.fail_entity("Tickets", "connection reset");
        let err = client
            .query("Tickets", &[FilterCondition::exists("id")], &[])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::Transport {
                message: "connection reset".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_peak_in_flight_tracks_overlap() {
        let client = client_with_rows(10, 3).with_latency(Duration::from_millis(5));
        let filters = [FilterCondition::exists("id")];
        let futures = (0..4).map(|_| client.query("Tickets", &filters, &[]));
        let results = futures::future::join_all(futures).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(client.peak_in_flight(), 4);
        assert_eq!(client.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_cursors_are_capped() {
        let client = client_with_rows(10, 30).with_max_pending(8);
        let filters = [FilterCondition::exists("id")];

        let mut cursors = Vec::new();
        for _ in 0..100 {
            let page = client.query("Tickets", &filters, &[]).await.unwrap();
            cursors.push(page.next_cursor.unwrap());
        }

        assert_eq!(client.pending_cursors(), 8);
        let err = client.advance(&cursors[0]).await.unwrap_err();
        assert!(matches!(err, ClientError::UnknownCursor { .. }));
        let page = client.advance(&cursors[99]).await.unwrap();
        assert_eq!(page.records.len(), 10);
    }

    #[tokio::test]
    async fn test_abandoned_cursors_expire() {
        let client = client_with_rows(10, 30).with_pending_ttl(Duration::from_millis(10));
        let filters = [FilterCondition::exists("id")];

        let stale = client.query("Tickets", &filters, &[]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let fresh = client.query("Tickets", &filters, &[]).await.unwrap();

        assert_eq!(client.pending_cursors(), 1);
        let err = client.advance(&stale.next_cursor.unwrap()).await.unwrap_err();
        assert!(matches!(err, ClientError::UnknownCursor { .. }));
        assert!(client.advance(&fresh.next_cursor.unwrap()).await.is_ok());
    }

    #[test]
    fn test_record_accessors_reject_wrong_types() {
        let record = Record::from_value(json!({
            "id": 7,
            "companyID": 12.0,
            "status": "open",
            "isNonBillable": "no"
        }))
        .unwrap();

        assert_eq!(record.id().unwrap(), 7);
        assert_eq!(record.int_field("companyID").unwrap(), Some(12));
        assert_eq!(record.int_field("missing").unwrap(), None);
        assert!(record.int_field("status").is_err());
        assert!(record.bool_field("isNonBillable").is_err());
    }
}
