//! The finalized event record and per-call emit options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tc_common::Level;

/// A sanitized event, as handed to transports and returned from `emit`.
///
/// Serializes to exactly `{event, timestamp, payload, correlationId?, level}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event name.
    pub event: String,
    /// Creation time, RFC 3339.
    pub timestamp: DateTime<Utc>,
    /// Redacted and size-bounded payload.
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub level: Level,
}

impl Event {
    /// Serialize as a single JSON line (without the trailing newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Options for a single `emit` call.
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    /// Overrides the configured correlation provider.
    pub correlation_id: Option<String>,
    /// Defaults to `info`.
    pub level: Option<Level>,
}

impl EmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(correlation_id: Option<&str>) -> Event {
        Event {
            event: "user.login".to_string(),
            timestamp: Utc::now(),
            payload: json!({"user": "ada"}),
            correlation_id: correlation_id.map(String::from),
            level: Level::Info,
        }
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(sample(Some("corr-1"))).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["correlationId", "event", "level", "payload", "timestamp"]);
        assert_eq!(value["level"], "info");
    }

    #[test]
    fn test_correlation_id_omitted_when_absent() {
        let value = serde_json::to_value(sample(None)).unwrap();
        assert!(value.get("correlationId").is_none());
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let line = sample(None).to_json_line().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        let ts = value["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_emit_options_builder() {
        let opts = EmitOptions::new().correlation_id("abc").level(Level::Warn);
        assert_eq!(opts.correlation_id.as_deref(), Some("abc"));
        assert_eq!(opts.level, Some(Level::Warn));
    }
}
