//! Configuration for the query engine.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// Maximum number of OR-conditions the remote accepts in one query.
pub const REMOTE_MAX_OR_CONDITIONS: usize = 500;

/// Billing item types that mark a time entry as posted (labour, labour adjustment).
pub const DEFAULT_POSTED_LEDGER_TYPES: [i64; 2] = [1, 6];

/// Configuration for the query engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Identifiers per `in` condition (never above [`REMOTE_MAX_OR_CONDITIONS`]).
    pub max_batch_size: usize,
    /// Batch requests allowed in flight at once.
    pub max_concurrency: usize,
    /// Ledger entry types that count as a posting.
    pub posted_ledger_types: Vec<i64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: REMOTE_MAX_OR_CONDITIONS,
            max_concurrency: 10,
            posted_ledger_types: DEFAULT_POSTED_LEDGER_TYPES.to_vec(),
        }
    }
}

impl EngineConfig {
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_posted_ledger_types(mut self, types: Vec<i64>) -> Self {
        self.posted_ledger_types = types;
        self
    }

    pub fn validate(&self) -> QueryResult<()> {
        if self.max_batch_size == 0 || self.max_batch_size > REMOTE_MAX_OR_CONDITIONS {
            return Err(QueryError::InvalidConfig {
                message: format!(
                    "max_batch_size must be between 1 and {REMOTE_MAX_OR_CONDITIONS}, got {}",
                    self.max_batch_size
                ),
            });
        }
        if self.max_concurrency == 0 {
            return Err(QueryError::InvalidConfig {
                message: "max_concurrency must be at least 1".to_string(),
            });
        }
        if self.posted_ledger_types.is_empty() {
            return Err(QueryError::InvalidConfig {
                message: "posted_ledger_types cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}
