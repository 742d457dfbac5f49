//! Prometheus counters for the event bus.
//!
//! ## Metrics
//!
//! - `events_emitted_total{event}`: events handed to transports
//! - `events_dropped_total{event,reason}`: events counted as dropped, by
//!   reason (`invalid`, `sampled`, `oversize`)

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Why an event was counted as dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The validator rejected the payload.
    Invalid,
    /// Sampling rejected the event.
    Sampled,
    /// The payload exceeded the size limit under the drop strategy.
    Oversize,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::Invalid => "invalid",
            DropReason::Sampled => "sampled",
            DropReason::Oversize => "oversize",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters for one bus. Cloning shares the underlying counters.
#[derive(Clone)]
pub struct EventMetrics {
    registry: Registry,
    emitted: IntCounterVec,
    dropped: IntCounterVec,
}

impl EventMetrics {
    /// Create the counters in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Create the counters and register them in `registry`.
    ///
    /// Fails if the registry already holds counters with the same names.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let emitted = IntCounterVec::new(
            Opts::new("events_emitted_total", "Events dispatched to transports"),
            &["event"],
        )?;
        registry.register(Box::new(emitted.clone()))?;

        let dropped = IntCounterVec::new(
            Opts::new("events_dropped_total", "Events dropped, by reason"),
            &["event", "reason"],
        )?;
        registry.register(Box::new(dropped.clone()))?;

        Ok(Self {
            registry,
            emitted,
            dropped,
        })
    }

    pub fn record_emitted(&self, event: &str) {
        self.emitted.with_label_values(&[event]).inc();
    }

    pub fn record_dropped(&self, event: &str, reason: DropReason) {
        self.dropped
            .with_label_values(&[event, reason.as_str()])
            .inc();
    }

    /// Current value of `events_emitted_total{event}`.
    ///
    /// Read from the gathered families, so querying an unseen event does not
    /// create an exported series for it.
    pub fn emitted(&self, event: &str) -> u64 {
        self.counter_value("events_emitted_total", &[("event", event)])
    }

    /// Current value of `events_dropped_total{event,reason}`.
    pub fn dropped(&self, event: &str, reason: DropReason) -> u64 {
        self.counter_value(
            "events_dropped_total",
            &[("event", event), ("reason", reason.as_str())],
        )
    }

    fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric().iter())
            .find(|metric| {
                labels.iter().all(|(key, value)| {
                    metric
                        .get_label()
                        .iter()
                        .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
                })
            })
            .map(|metric| metric.get_counter().get_value() as u64)
            .unwrap_or(0)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = EventMetrics::new().unwrap();
        metrics.record_emitted("a");
        metrics.record_emitted("a");
        metrics.record_dropped("a", DropReason::Sampled);

        assert_eq!(metrics.emitted("a"), 2);
        assert_eq!(metrics.emitted("b"), 0);
        assert_eq!(metrics.dropped("a", DropReason::Sampled), 1);
        assert_eq!(metrics.dropped("a", DropReason::Oversize), 0);
    }

    #[test]
    fn test_render_exposition() {
        let metrics = EventMetrics::new().unwrap();
        metrics.record_emitted("user.login");
        metrics.record_dropped("user.login", DropReason::Invalid);

        let text = metrics.render().unwrap();
        assert!(text.contains("events_emitted_total{event=\"user.login\"} 1"));
        assert!(text.contains("reason=\"invalid\""));
    }

    #[test]
    fn test_queries_do_not_create_series() {
        let metrics = EventMetrics::new().unwrap();
        metrics.record_emitted("seen");
        assert_eq!(metrics.emitted("never.emitted"), 0);
        assert_eq!(metrics.dropped("never.emitted", DropReason::Oversize), 0);

        let text = metrics.render().unwrap();
        assert!(text.contains("events_emitted_total{event=\"seen\"} 1"));
        assert!(!text.contains("never.emitted"));
    }

    #[test]
    fn test_shared_registry_rejects_duplicates() {
        let registry = Registry::new();
        assert!(EventMetrics::with_registry(registry.clone()).is_ok());
        assert!(EventMetrics::with_registry(registry).is_err());
    }

    #[test]
    fn test_drop_reason_labels() {
        assert_eq!(DropReason::Invalid.to_string(), "invalid");
        assert_eq!(DropReason::Sampled.to_string(), "sampled");
        assert_eq!(DropReason::Oversize.to_string(), "oversize");
    }
}
