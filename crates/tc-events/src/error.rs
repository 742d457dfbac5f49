//! Error types for the event bus.

use thiserror::Error;

use tc_redact::RedactionError;

/// Rejection returned by a payload validator.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error returned by [`crate::EventBus::emit`].
///
/// Only produced when the bus runs in `ValidationMode::Throw`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmitError {
    #[error("invalid payload for event {event}: {source}")]
    Invalid {
        event: String,
        #[source]
        source: ValidationError,
    },
}

/// Errors from building or reconfiguring an event bus.
#[derive(Error, Debug)]
pub enum EventsError {
    #[error("redaction config error: {0}")]
    Redaction(#[from] RedactionError),

    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}
