//! Error types for the redaction engine.

use thiserror::Error;

/// Result type for redaction operations.
pub type Result<T> = std::result::Result<T, RedactionError>;

/// Errors that can occur while building or applying a redaction policy.
///
/// Traversal errors never reach the caller of `redact`; they are reported to
/// the configured error hook and the affected node is replaced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RedactionError {
    /// A pattern string failed to compile.
    #[error("invalid redaction pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A float leaf cannot be represented in JSON.
    #[error("non-finite number at {path}")]
    NonFiniteNumber { path: String },

    /// A container's lock was poisoned by a panicking writer.
    #[error("poisoned container at {path}")]
    PoisonedContainer { path: String },
}

impl RedactionError {
    /// Build an [`RedactionError::InvalidPattern`] from a regex error.
    pub fn invalid_pattern(pattern: &str, err: &regex::Error) -> Self {
        RedactionError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        }
    }
}
