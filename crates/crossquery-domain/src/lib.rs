//! crossquery-domain: Cross-entity query engine
//!
//! This crate answers "which time entries match these related-entity
//! conditions" against a remote API that only filters on one entity at a time:
//! - Batched-ID lookups with bounded concurrency
//! - Staged cross-entity filter resolution
//! - Posting-status reconciliation against the billing ledger
//! - Bounded and unbounded primary pagination
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             crossquery-domain               │
//! ├─────────────────────────────────────────────┤
//! │  collector/ - Pagination state machine      │
//! │  resolver/  - Filter stages & ownership     │
//! │  reconcile  - Posted / unposted partition   │
//! │  lookup     - Batched related-entity reads  │
//! │  batch      - Partitioning & bounded runner │
//! └─────────────────────────────────────────────┘
//! ```

pub mod batch;
pub mod collector;
pub mod config;
pub mod error;
pub mod lookup;
pub mod reconcile;
pub mod request;
pub mod resolver;
pub mod schema;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types at the crate root
pub use batch::{partition, run_bounded};
pub use collector::{CollectorState, QueryEngine, QueryOutcome};
pub use config::EngineConfig;
pub use error::{QueryError, QueryResult};
pub use lookup::{BatchedLookup, LookupIndex, LookupRequest};
pub use reconcile::{PostingReconciler, Reconciliation};
pub use request::{PageMode, PostingStatus, PrimaryFilters, QueryRequest};
pub use resolver::{DueDateWindow, Explicit, FilterResolver, FilterSelections, Stage};
