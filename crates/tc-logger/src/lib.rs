//! Structured logger built on the telemetry core.
//!
//! A [`Logger`] gates entries by level and per-level sampling, merges bound
//! and call-site context, resolves a correlation id, redacts the whole record
//! and hands the resulting [`LogEntry`] to the registered transports. With no
//! transports registered, entries go to the `tracing` fallback sink.
//!
//! Warn and error entries are mirrored into an attached
//! [`tc_events::EventBus`] as `log.warn` / `log.error` events, where the bus
//! applies its own redaction policy again.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tc_logger::{Logger, LoggerConfig};
//!
//! let logger = Logger::new(LoggerConfig::default()).namespace("api");
//! let requests = logger.with(json!({"requestId": "r-1"}));
//! let entry = requests.info("login", json!({"password": "hunter2"})).unwrap();
//! assert_eq!(entry.namespace, "api");
//! assert_eq!(entry.fields["password"], "[REDACTED]");
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod logger;
pub mod sink;

pub use config::{LevelSampling, LevelSamplingPatch, LoggerConfig, LoggerConfigPatch};
pub use entry::{LogEntry, RESERVED_KEYS};
pub use error::LoggerError;
pub use logger::Logger;
pub use tc_common::Level;
