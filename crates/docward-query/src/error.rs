//! Error types for query construction and execution.

use thiserror::Error;

/// Errors raised by the query model and the reference executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The query is structurally invalid.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The reference executor does not support this construct.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
