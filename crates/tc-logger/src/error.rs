//! Error types for the logger.

use thiserror::Error;

use tc_redact::RedactionError;

/// Errors from configuring a logger.
///
/// Log calls themselves never fail.
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("redaction config error: {0}")]
    Redaction(#[from] RedactionError),
}
