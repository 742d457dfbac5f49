//! Error types for the telemetry facade.

use std::path::PathBuf;

use thiserror::Error;

use tc_events::EventsError;
use tc_logger::LoggerError;

/// Errors loading a telemetry config file or its environment overrides.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {var}: {message}")]
    InvalidEnv {
        var: String,
        value: String,
        message: String,
    },
}

/// Errors from building the telemetry stack.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("event bus: {0}")]
    Events(#[from] EventsError),

    #[error("logger: {0}")]
    Logger(#[from] LoggerError),

    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
}

/// Result type for the facade.
pub type Result<T> = std::result::Result<T, TelemetryError>;
