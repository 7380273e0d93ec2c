//! Domain error types for cross-entity queries.

use crossquery_client::ClientError;
use thiserror::Error;

/// Errors raised while resolving a cross-entity query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Transport or remote failure, propagated unmodified from the client.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A record returned by the remote lacked an expected field or had the wrong shape.
    #[error("malformed {entity} record, field '{field}': {message}")]
    MalformedRecord {
        entity: String,
        field: String,
        message: String,
    },

    /// A caller-supplied filter value was invalid.
    #[error("invalid filter '{field}': {message}")]
    InvalidSelection { field: String, message: String },

    /// Engine configuration is unusable.
    #[error("invalid engine configuration: {message}")]
    InvalidConfig { message: String },
}

impl QueryError {
    pub fn invalid_selection(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelection {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true when the caller's input, not the remote service, caused the failure.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidSelection { .. } | Self::InvalidConfig { .. })
    }

    /// Attaches entity context to a field-level client error.
    pub(crate) fn from_field(entity: &str, err: ClientError) -> Self {
        match err {
            ClientError::MalformedField { field, message } => Self::MalformedRecord {
                entity: entity.to_string(),
                field,
                message,
            },
            other => Self::Client(other),
        }
    }
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
