//! Streaming bounded collector.
//!
//! Drives primary-entity pagination and runs the resolver and reconciler
//! over the results. In [`PageMode::All`] every page is materialized before
//! a single resolve/reconcile pass. In [`PageMode::Limit`] each page is
//! resolved and reconciled on its own and pagination stops as soon as the
//! target count is reached:
//!
//! ```text
//! AwaitingPage → ResolvingPage → ReconcilingPage → (AwaitingPage | Done)
//! ```
//!
//! Any error aborts the invocation; there is no partial result.

use std::sync::Arc;

use crossquery_client::{Cursor, FilterCondition, QueryClient, Record};
use tracing::{debug, info, instrument, trace};

use crate::config::EngineConfig;
use crate::error::QueryResult;
use crate::lookup::BatchedLookup;
use crate::reconcile::PostingReconciler;
use crate::request::{PageMode, QueryRequest};
use crate::resolver::FilterResolver;
use crate::schema;


/// States of the bounded collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    AwaitingPage,
    ResolvingPage,
    ReconcilingPage,
    Done,
}

/// Result of one query invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    /// Matching primary records, in primary page order.
    pub records: Vec<Record>,
    /// Primary pages requested.
    pub pages_fetched: usize,
    /// Whether the primary result set was read to its end.
    pub exhausted: bool,
}

/// Entry point of the engine: one [`QueryRequest`] in, one [`QueryOutcome`] out.
pub struct QueryEngine<C: ?Sized> {
    client: Arc<C>,
    resolver: FilterResolver<C>,
    reconciler: PostingReconciler<C>,
}

impl<C> QueryEngine<C>
where
    C: QueryClient + ?Sized,
{
    /// Creates an engine after validating `config`.
    pub fn new(client: Arc<C>, config: EngineConfig) -> QueryResult<Self> {
        config.validate()?;
        let lookup = Arc::new(BatchedLookup::new(Arc::clone(&client), &config));
        Ok(Self {
            client,
            resolver: FilterResolver::new(Arc::clone(&lookup)),
            reconciler: PostingReconciler::new(lookup, config.posted_ledger_types),
        })
    }

    pub fn resolver(&self) -> &FilterResolver<C> {
        &self.resolver
    }

    pub fn reconciler(&self) -> &PostingReconciler<C> {
        &self.reconciler
    }

    #[instrument(skip_all, fields(status = %request.posting_status, mode = ?request.page_mode))]
    pub async fn run(&self, request: &QueryRequest) -> QueryResult<QueryOutcome> {
        request.validate()?;
        let conditions = request.primary.conditions();
        let fields = request.projected_fields();

        let outcome = match request.page_mode {
            PageMode::All => self.collect_all(request, &conditions, &fields).await?,
            PageMode::Limit(target) => {
                self.collect_bounded(request, &conditions, &fields, target)
                    .await?
            }
        };

        info!(
            matches = outcome.records.len(),
            pages = outcome.pages_fetched,
            exhausted = outcome.exhausted,
            "query complete"
        );
        Ok(outcome)
    }

    async fn collect_all(
        &self,
        request: &QueryRequest,
        conditions: &[FilterCondition],
        fields: &[String],
    ) -> QueryResult<QueryOutcome> {
        let mut page = self
            .client
            .query(schema::TIME_ENTRIES, conditions, fields)
            .await?;
        let mut candidates = std::mem::take(&mut page.records);
        let mut pages_fetched = 1;

        while let Some(cursor) = page.next_cursor.take() {
            page = self.client.advance(&cursor).await?;
            candidates.append(&mut page.records);
            pages_fetched += 1;
        }
        debug!(candidates = candidates.len(), pages_fetched, "primary set materialized");

        let candidates = self.resolver.resolve(candidates, &request.selections).await?;
        let records = self
            .reconciler
            .reconcile(candidates)
            .await?
            .select(request.posting_status);

        Ok(QueryOutcome {
            records,
            pages_fetched,
            exhausted: true,
        })
    }

    async fn collect_bounded(
        &self,
        request: &QueryRequest,
        conditions: &[FilterCondition],
        fields: &[String],
        target: usize,
    ) -> QueryResult<QueryOutcome> {
        let mut state = CollectorState::AwaitingPage;
        let mut cursor: Option<Cursor> = None;
        let mut page_records: Vec<Record> = Vec::new();
        let mut matches: Vec<Record> = Vec::new();
        let mut pages_fetched = 0;

        while state != CollectorState::Done {
            trace!(?state, pages_fetched, matches = matches.len(), "collector step");
            state = match state {
                CollectorState::AwaitingPage => {
                    // Only the first page is requested without a cursor.
                    let page = match cursor.take() {
                        Some(next) => self.client.advance(&next).await?,
                        None => {
                            self.client
                                .query(schema::TIME_ENTRIES, conditions, fields)
                                .await?
                        }
                    };
                    pages_fetched += 1;
                    cursor = page.next_cursor;
                    page_records = page.records;
                    CollectorState::ResolvingPage
                }
                CollectorState::ResolvingPage => {
                    page_records = self
                        .resolver
                        .resolve(std::mem::take(&mut page_records), &request.selections)
                        .await?;
                    CollectorState::ReconcilingPage
                }
                CollectorState::ReconcilingPage => {
                    let reconciled = self
                        .reconciler
                        .reconcile(std::mem::take(&mut page_records))
                        .await?;
                    matches.extend(reconciled.select(request.posting_status));
                    if matches.len() >= target || cursor.is_none() {
                        CollectorState::Done
                    } else {
                        CollectorState::AwaitingPage
                    }
                }
                CollectorState::Done => CollectorState::Done,
            };
        }

        matches.truncate(target);
        Ok(QueryOutcome {
            records: matches,
            pages_fetched,
            exhausted: cursor.is_none(),
        })
    }
}
