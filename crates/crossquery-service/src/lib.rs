//! crossquery-service: Query service surface
//!
//! Everything between a caller and the query engine:
//! - Layered configuration (defaults, YAML file, `CROSSQUERY_` environment)
//! - Filter parameter parsing and validation
//! - Request handling
//! - Logging setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             crossquery-service              │
//! ├─────────────────────────────────────────────┤
//! │  params.rs        - FilterParams → request  │
//! │  handler.rs       - TimeEntryQueryHandler   │
//! │  config.rs        - ServiceConfig loading   │
//! │  observability.rs - tracing-subscriber      │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod handler;
pub mod observability;
pub mod params;

pub use config::{ClientSettings, ConfigLoadError, LoggingSettings, ServiceConfig};
pub use handler::{QueryResponse, TimeEntryQueryHandler};
pub use observability::{init_logging, LoggingConfig};
pub use params::FilterParams;
