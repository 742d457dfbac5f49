//! Telemetry facade.
//!
//! Ties the event bus and the logger together:
//! - [`configure_telemetry`] builds both from one [`TelemetryConfig`], which
//!   can be loaded from a JSON file and overridden from the environment.
//! - [`shutdown_telemetry`] drains both channels concurrently under one
//!   timeout.
//! - [`JsonlTransport`] writes events or log entries as JSON lines.
//! - [`diagnostics::init_tracing`] installs the subscriber for the core's own
//!   diagnostics and the logger's fallback sink.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use serde_json::json;
//! use tc_events::EmitOptions;
//! use tc_telemetry::{configure_telemetry, shutdown_telemetry, JsonlTransport, TelemetryConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TelemetryConfig::load("telemetry.json")?.with_env_overrides()?;
//! let telemetry = configure_telemetry(config)?;
//!
//! let sink = Arc::new(JsonlTransport::append("telemetry.jsonl")?);
//! telemetry.events().add_transport_shared(Arc::clone(&sink));
//! telemetry.logger().add_log_transport_shared(sink);
//!
//! telemetry.events().emit("app.started", json!({"version": "1.0"}), EmitOptions::new())?;
//! telemetry.logger().namespace("db").warn("slow query", json!({"ms": 900}));
//!
//! shutdown_telemetry(&telemetry, Duration::from_secs(2)).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod facade;
pub mod jsonl;

pub use config::TelemetryConfig;
pub use error::{ConfigError, Result, TelemetryError};
pub use facade::{configure_telemetry, shutdown_telemetry, Telemetry};
pub use jsonl::JsonlTransport;
