//! Client error types.

use thiserror::Error;

/// Errors raised by a paginated query client.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// The request never reached the remote service, or the connection failed.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The remote service received the query and refused it.
    #[error("query rejected by remote for entity '{entity}': {message}")]
    Rejected { entity: String, message: String },

    /// The filter violates a per-request limit of the remote API.
    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    /// The continuation cursor is unknown or has already been consumed.
    #[error("unknown or expired cursor: {cursor}")]
    UnknownCursor { cursor: String },

    /// The response did not have the expected shape.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    /// A record field was present with an unexpected type.
    #[error("malformed field '{field}': {message}")]
    MalformedField { field: String, message: String },
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
