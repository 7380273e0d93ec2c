//! Time entry query handler.
//!
//! Ties the pieces together for one caller invocation: raw parameters are
//! parsed and validated, the engine runs, and the outcome is shaped into a
//! serializable response.

use std::sync::Arc;

use crossquery_client::{QueryClient, Record};
use crossquery_domain::{QueryEngine, QueryOutcome, QueryResult};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::ServiceConfig;
use crate::params::FilterParams;

/// Response returned for one query invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub records: Vec<Record>,
    pub pages_fetched: usize,
    /// False when bounded collection stopped before the primary set ended.
    pub exhausted: bool,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(outcome: QueryOutcome) -> Self {
        Self {
            records: outcome.records,
            pages_fetched: outcome.pages_fetched,
            exhausted: outcome.exhausted,
        }
    }
}

/// Answers time entry queries against one remote client.
pub struct TimeEntryQueryHandler<C: ?Sized> {
    engine: QueryEngine<C>,
}

impl<C> TimeEntryQueryHandler<C>
where
    C: QueryClient + ?Sized,
{
    pub fn new(client: Arc<C>, config: &ServiceConfig) -> QueryResult<Self> {
        Ok(Self {
            engine: QueryEngine::new(client, config.engine.clone())?,
        })
    }

    pub fn engine(&self) -> &QueryEngine<C> {
        &self.engine
    }

    #[instrument(skip_all)]
    pub async fn handle(&self, params: &FilterParams) -> QueryResult<QueryResponse> {
        let request = match params.parse() {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "rejected query parameters");
                return Err(e);
            }
        };

        let outcome = self.engine.run(&request).await?;
        info!(
            status = %request.posting_status,
            records = outcome.records.len(),
            "time entry query answered"
        );
        Ok(outcome.into())
    }
}
