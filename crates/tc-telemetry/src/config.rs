//! Telemetry configuration file.
//!
//! A single JSON document configures the event bus, the logger and the event
//! definitions:
//!
//! ```json
//! {
//!   "events": { "samplingDefault": 1.0, "maxPayloadBytes": 8192 },
//!   "logger": { "level": "info", "escalate": true },
//!   "definitions": [ { "name": "payment.captured", "redactKeys": ["card"] } ],
//!   "drainTimeoutMs": 2000
//! }
//! ```
//!
//! Environment overrides (applied by [`TelemetryConfig::with_env_overrides`]):
//! - `TC_LOG_LEVEL`: logger minimum level
//! - `TC_SAMPLING_DEFAULT`: default event sampling probability
//! - `TC_MAX_PAYLOAD_BYTES`: event payload size limit (`none` removes it)

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use tc_common::{Level, DEFAULT_DRAIN_TIMEOUT_MS};
use tc_events::{EventDefinition, EventsConfigPatch};
use tc_logger::LoggerConfigPatch;

use crate::ConfigError;

pub const ENV_LOG_LEVEL: &str = "TC_LOG_LEVEL";
pub const ENV_SAMPLING_DEFAULT: &str = "TC_SAMPLING_DEFAULT";
pub const ENV_MAX_PAYLOAD_BYTES: &str = "TC_MAX_PAYLOAD_BYTES";

/// Configuration for [`crate::configure_telemetry`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub events: EventsConfigPatch,
    #[serde(default)]
    pub logger: LoggerConfigPatch,
    #[serde(default)]
    pub definitions: Vec<EventDefinition>,
    /// Default bound for [`crate::Telemetry::shutdown_default`].
    #[serde(default)]
    pub drain_timeout_ms: Option<u64>,
}

impl TelemetryConfig {
    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            let level = value
                .parse::<Level>()
                .map_err(|message| invalid(ENV_LOG_LEVEL, &value, message))?;
            self.logger.level = Some(level);
        }

        if let Some(value) = lookup(ENV_SAMPLING_DEFAULT) {
            let probability = value
                .trim()
                .parse::<f64>()
                .map_err(|e| invalid(ENV_SAMPLING_DEFAULT, &value, e.to_string()))?;
            if !probability.is_finite() {
                return Err(invalid(ENV_SAMPLING_DEFAULT, &value, "must be a finite number".into()));
            }
            self.events.sampling_default = Some(probability);
        }

        if let Some(value) = lookup(ENV_MAX_PAYLOAD_BYTES) {
            let limit = match value.trim() {
                "none" | "off" => None,
                raw => Some(
                    raw.parse::<usize>()
                        .map_err(|e| invalid(ENV_MAX_PAYLOAD_BYTES, &value, e.to_string()))?,
                ),
            };
            self.events.max_payload_bytes = Some(limit);
        }

        Ok(self)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms.unwrap_or(DEFAULT_DRAIN_TIMEOUT_MS))
    }
}

fn invalid(var: &str, value: &str, message: String) -> ConfigError {
    ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
        message,
    }
}
