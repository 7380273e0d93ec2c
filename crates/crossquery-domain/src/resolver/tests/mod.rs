//! Tests for the cross-entity resolver.
//!
//! Organized by functionality:
//! - Pipeline identity and monotonicity
//! - One-hop stages (contract, ticket, task)
//! - Ownership chain (account manager)
//! - Error propagation
