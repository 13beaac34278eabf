//! Spring error types

use thiserror::Error;

/// Errors surfaced by spring construction and stepping
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpringError {
    /// A configuration value would make the integrator divide by zero,
    /// produce NaN, or never satisfy the rest test
    #[error("Invalid spring configuration: {0}")]
    InvalidConfiguration(String),

    /// The simulator or its host cannot carry out the request
    #[error("Invalid spring state: {0}")]
    InvalidState(String),
}

/// Result type for spring operations
pub type Result<T> = std::result::Result<T, SpringError>;
