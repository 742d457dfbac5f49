//! One configuration and one shutdown across the event bus and the logger.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use tc_events::EventBus;
use tc_logger::{Logger, LoggerConfig};

use crate::{Result, TelemetryConfig};

/// The event bus and the root logger escalating into it.
pub struct Telemetry {
    events: Arc<EventBus>,
    logger: Logger,
    drain_timeout: Duration,
}

/// Build a bus and a root logger from `config`.
pub fn configure_telemetry(config: TelemetryConfig) -> Result<Telemetry> {
    let events = Arc::new(EventBus::new()?);
    let logger = Logger::with_bus(LoggerConfig::default(), Arc::clone(&events));
    let telemetry = Telemetry {
        events,
        logger,
        drain_timeout: config.drain_timeout(),
    };
    telemetry.apply(config)?;
    Ok(telemetry)
}

/// Drain both channels concurrently under one `timeout`.
pub async fn shutdown_telemetry(telemetry: &Telemetry, timeout: Duration) -> bool {
    telemetry.shutdown(timeout).await
}

impl Telemetry {
    /// Merge `config` into the running bus and logger.
    ///
    /// Definitions are registered (replacing same-named ones).
    pub fn configure(&mut self, config: TelemetryConfig) -> Result<()> {
        if config.drain_timeout_ms.is_some() {
            self.drain_timeout = config.drain_timeout();
        }
        self.apply(config)
    }

    fn apply(&self, config: TelemetryConfig) -> Result<()> {
        self.events.configure_events(config.events)?;
        for definition in config.definitions {
            self.events.register_event_definition(definition);
        }
        self.logger.configure_logger(config.logger)?;
        Ok(())
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The root logger; derive namespaced children from it.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Wait for in-flight event and log deliveries.
    ///
    /// Both drains run concurrently, each bounded by `timeout`, and the pair is
    /// bounded by `timeout` again. Returns `false` if anything was still
    /// pending when it elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let drains = async {
            let (events, logs) = tokio::join!(
                self.events.drain_events(timeout),
                self.logger.drain_logs(timeout)
            );
            events && logs
        };
        match tokio::time::timeout(timeout, drains).await {
            Ok(drained) => {
                debug!(drained, "telemetry shutdown finished");
                drained
            }
            Err(_) => {
                warn!(
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    pending_events = self.events.pending_event_transports_count(),
                    pending_logs = self.logger.pending_log_transports_count(),
                    "telemetry shutdown timed out"
                );
                false
            }
        }
    }

    /// [`Telemetry::shutdown`] with the configured drain timeout.
    pub async fn shutdown_default(&self) -> bool {
        self.shutdown(self.drain_timeout).await
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("logger", &self.logger)
            .field("drain_timeout", &self.drain_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tc_common::{Delivery, Level};
    use tc_events::{EmitOptions, Event, EventDefinition};
    use tc_logger::LogEntry;

    #[test]
    fn test_configure_applies_both_halves() {
        let config: TelemetryConfig = serde_json::from_str(
            r#"{
                "events": {"addRedactKeys": ["ssn"]},
                "logger": {"level": "warn"},
                "drainTimeoutMs": 250
            }"#,
        )
        .unwrap();
        let telemetry = configure_telemetry(config).unwrap();

        assert_eq!(telemetry.logger().config().level, Level::Warn);
        assert_eq!(telemetry.drain_timeout(), Duration::from_millis(250));
        let event = telemetry
            .events()
            .emit("x", json!({"ssn": "1"}), EmitOptions::new())
            .unwrap();
        assert_eq!(event.payload["ssn"], "[REDACTED]");
    }

    #[test]
    fn test_reconfigure_registers_definitions() {
        let mut telemetry = configure_telemetry(TelemetryConfig::default()).unwrap();
        let config = TelemetryConfig {
            definitions: vec![EventDefinition::new("x").with_redact_keys(["pin"])],
            ..TelemetryConfig::default()
        };
        telemetry.configure(config).unwrap();
        assert!(telemetry.events().get_event_definition("x").is_some());
    }

    #[test]
    fn test_logger_escalates_into_bus() {
        let telemetry = configure_telemetry(TelemetryConfig::default()).unwrap();
        telemetry.logger().add_log_transport(|_: &LogEntry| Delivery::Done);
        telemetry.logger().error("boom", Value::Null);
        assert_eq!(telemetry.events().metrics().emitted("log.error"), 1);
    }

    #[tokio::test]
    async fn test_shutdown_with_no_work() {
        let telemetry = configure_telemetry(TelemetryConfig::default()).unwrap();
        assert!(shutdown_telemetry(&telemetry, Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn test_shutdown_times_out_on_hanging_transport() {
        let telemetry = configure_telemetry(TelemetryConfig::default()).unwrap();
        telemetry
            .events()
            .add_transport(|_: &Event| Delivery::pending(std::future::pending()));
        telemetry
            .events()
            .emit("x", json!({}), EmitOptions::new())
            .unwrap();

        assert!(!shutdown_telemetry(&telemetry, Duration::from_millis(30)).await);
        assert_eq!(telemetry.events().pending_event_transports_count(), 1);
    }
}
