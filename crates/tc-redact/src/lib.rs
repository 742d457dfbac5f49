//! Structural redaction engine for telemetry payloads.
//!
//! This crate provides the redaction engine shared by the event bus and the
//! logger. A [`Redactor`] is compiled from an immutable [`RedactionConfig`]
//! and turns a [`Payload`] graph into a sanitized, structurally independent
//! `serde_json::Value`.
//!
//! # Key Features
//!
//! - **Key-based redaction**: values under sensitive keys (case-insensitive)
//!   are replaced with the censor text, whatever their type.
//! - **Pattern redaction**: string leaves are scanned with the configured
//!   regexes in declaration order.
//! - **Cycle safety**: shared containers that point back at an ancestor are
//!   replaced with a circular marker instead of recursing.
//! - **Depth bounding**: subtrees below `max_depth` collapse to a marker.
//! - **Never fails the caller**: traversal errors go to an optional hook and
//!   the best-effort clone is still returned.
//! - **Caching**: [`RedactorCache`] rebuilds only when the policy fingerprint
//!   changes, and memoizes per-definition derived redactors.
//!
//! # Example
//!
//! ```
//! use tc_redact::{Payload, RedactionConfig, Redactor};
//!
//! let redactor = Redactor::new(RedactionConfig::default());
//! let payload = Payload::from(serde_json::json!({"user": "ada", "password": "hunter2"}));
//! let clean = redactor.redact(&payload);
//! assert_eq!(clean["password"], "[REDACTED]");
//! assert_eq!(clean["user"], "ada");
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod patterns;
pub mod payload;

pub use cache::{Fingerprint, RedactorCache};
pub use config::{RedactionConfig, RedactionErrorHook};
pub use engine::Redactor;
pub use error::{RedactionError, Result};
pub use patterns::{default_secret_patterns, DEFAULT_REDACT_KEYS, DEFAULT_SECRET_PATTERN_SOURCES};
pub use payload::Payload;

/// Default replacement for redacted values.
pub const DEFAULT_CENSOR: &str = "[REDACTED]";

/// Default replacement for back-references to an ancestor container.
pub const DEFAULT_CIRCULAR_MARKER: &str = "[Circular]";

/// Default replacement for subtrees beyond the depth limit.
pub const DEFAULT_TRUNCATED_MARKER: &str = "[Truncated]";
