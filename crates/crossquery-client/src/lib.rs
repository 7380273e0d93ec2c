//! crossquery-client: Paginated query client contract
//!
//! This crate defines the boundary between the query engine and the remote
//! record-keeping service:
//! - `QueryClient` trait (fresh query + cursor advance)
//! - Filter conditions, records, pages and cursors
//! - In-memory implementation for testing
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             crossquery-client                │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - QueryClient + wire types     │
//! │  memory.rs   - In-memory implementation     │
//! │  error.rs    - Client errors                │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{ClientError, ClientResult};
pub use memory::MemoryQueryClient;
pub use traits::{Cursor, FilterCondition, FilterOp, Page, QueryClient, Record};
