//! Error types for the engine facade.

use docward_config::ConfigError;
use docward_policy::{ConfigurationError, PolicyError};
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, DocwardError>;

#[derive(Debug, Error)]
pub enum DocwardError {
    /// Engine settings are invalid.
    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    /// A policy definition was rejected at build time.
    #[error("invalid policy configuration: {0}")]
    Policy(#[from] ConfigurationError),

    /// The builder was not given a membership oracle.
    #[error("no membership oracle configured")]
    MissingOracle,

    /// A permission check or query transform failed.
    #[error(transparent)]
    Enforcement(#[from] PolicyError),
}
