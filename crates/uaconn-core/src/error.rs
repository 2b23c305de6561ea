//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur when constructing or allocating domain values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Node reference was empty or whitespace only
    #[error("Invalid node id: {value:?}")]
    InvalidNodeId { value: String },

    /// Sampling interval was not a positive, finite number of milliseconds
    #[error("Invalid sampling interval: {millis} ms (expected a positive, finite value)")]
    InvalidSamplingInterval { millis: f64 },

    /// The 32-bit client handle space has been used up
    #[error("Client handle space exhausted after {issued} handles")]
    HandleSpaceExhausted { issued: u32 },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
