//! Error types for policy construction and enforcement.

use docward_types::OracleError;
use thiserror::Error;

/// Errors returned by policy evaluation and query transformation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The membership oracle failed. Never converted into a decision.
    #[error("membership oracle failed: {0}")]
    Oracle(#[from] OracleError),

    /// A policy or chain definition is invalid.
    #[error("invalid policy configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Membership-dependent filters need a principal with known groups.
    #[error("principal '{0}' has not been resolved")]
    UnresolvedPrincipal(String),
}

/// A policy definition that cannot be enforced consistently.
///
/// Raised by [`PolicyChainBuilder::build`](crate::PolicyChainBuilder::build),
/// never at request time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("policy '{policy}' references unknown field '{field}'")]
    UnknownField { policy: String, field: String },

    #[error("policy '{policy}' uses field '{field}' as {expected}, but the schema declares {declared}")]
    FieldTypeMismatch {
        policy: String,
        field: String,
        expected: &'static str,
        declared: &'static str,
    },

    #[error("policy '{policy}' references unknown group '{group}'")]
    UnknownGroup { policy: String, group: String },

    #[error("policy '{policy}' guards on unknown document type '{type_name}'")]
    UnknownType { policy: String, type_name: String },

    #[error("duplicate policy name '{0}'")]
    DuplicatePolicy(String),

    #[error("policy name must not be empty")]
    EmptyPolicyName,

    #[error("policy name '{name}' exceeds {max} characters")]
    PolicyNameTooLong { name: String, max: usize },

    #[error("policy '{policy}': decision table {table} does not fit a {shape}")]
    DecisionTableMismatch {
        policy: String,
        shape: &'static str,
        table: String,
    },

    #[error("policy '{policy}' tests membership in an empty value set for field '{field}'")]
    EmptyValueSet { policy: String, field: String },

    #[error("policy '{policy}' maps field '{field}' to no groups")]
    EmptyGroupMapping { policy: String, field: String },

    #[error("too many policies in chain: {count} (max {max})")]
    TooManyPolicies { count: usize, max: usize },
}

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
