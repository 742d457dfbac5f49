//! Subscriber setup for the core's own diagnostics.
//!
//! The core reports validation warnings, transport failures and drain
//! outcomes through `tracing`, and the logger's fallback sink writes entries
//! under the `tc_logger::sink` target. [`init_tracing`] installs a global
//! subscriber for all of it:
//! - human-readable output on stderr, or
//! - JSON lines on stderr, with secrets redacted from string fields.

pub mod config;
pub mod layer;

pub use config::{TracingConfig, TracingFormat};
pub use layer::JsonlLayer;

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::TelemetryError;

/// Install the global tracing subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TelemetryError> {
    let filter = match &config.directive {
        Some(directive) => EnvFilter::try_new(directive)
            .unwrap_or_else(|_| EnvFilter::new(config.level.to_string())),
        None => EnvFilter::new(config.level.to_string()),
    };

    let result = match config.format {
        TracingFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(use_ansi);
            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
            }
        }
        TracingFormat::Jsonl => tracing_subscriber::registry()
            .with(filter)
            .with(JsonlLayer::stderr())
            .try_init(),
    };
    result.map_err(|e| TelemetryError::Tracing(e.to_string()))
}

/// Install the subscriber configured from the environment.
pub fn init_default_tracing() -> Result<(), TelemetryError> {
    init_tracing(&TracingConfig::from_env())
}
