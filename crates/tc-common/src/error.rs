//! Error types for transport delivery.

use thiserror::Error;

/// Failure of a single transport during dispatch.
///
/// Every variant carries the transport's index within the dispatch, i.e. its
/// position in registration order at the time the record was delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport reported a failure, synchronously or from its future.
    #[error("transport {index} failed: {message}")]
    Failed { index: usize, message: String },

    /// The transport panicked while delivering.
    #[error("transport {index} panicked: {message}")]
    Panicked { index: usize, message: String },

    /// The async delivery did not settle within the channel timeout.
    #[error("transport {index} timed out after {timeout_ms}ms")]
    Timeout { index: usize, timeout_ms: u64 },

    /// The transport returned a pending delivery but no Tokio runtime was
    /// available to drive it.
    #[error("transport {index} returned a pending delivery outside a tokio runtime")]
    NoRuntime { index: usize },
}

impl TransportError {
    /// Index of the failing transport.
    pub fn index(&self) -> usize {
        match self {
            TransportError::Failed { index, .. }
            | TransportError::Panicked { index, .. }
            | TransportError::Timeout { index, .. }
            | TransportError::NoRuntime { index } => *index,
        }
    }

    /// Whether this error came from the timeout race.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_for_every_variant() {
        let errors = [
            TransportError::Failed { index: 1, message: "x".into() },
            TransportError::Panicked { index: 1, message: "x".into() },
            TransportError::Timeout { index: 1, timeout_ms: 10 },
            TransportError::NoRuntime { index: 1 },
        ];
        for err in errors {
            assert_eq!(err.index(), 1);
        }
    }

    #[test]
    fn test_timeout_display() {
        let err = TransportError::Timeout { index: 2, timeout_ms: 250 };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "transport 2 timed out after 250ms");
    }
}
