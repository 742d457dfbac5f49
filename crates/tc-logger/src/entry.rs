//! The finalized log record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tc_common::Level;

/// Keys owned by the logger; context fields with these names are replaced.
pub const RESERVED_KEYS: &[&str] = &[
    "level",
    "msg",
    "namespace",
    "correlationId",
    "errorCode",
    "timestamp",
];

/// A redacted log entry.
///
/// Serializes to `{level, msg, namespace, correlationId, errorCode, timestamp}`
/// followed by the bound and call-site fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: Level,
    pub msg: String,
    /// Colon-joined namespace path; empty for the root logger.
    pub namespace: String,
    /// Empty when no id was given and no provider supplied one.
    pub correlation_id: String,
    pub error_code: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogEntry {
    /// Split a redacted record into the reserved fields and the rest.
    pub(crate) fn from_redacted(level: Level, record: Value, timestamp: DateTime<Utc>) -> Self {
        let mut fields = match record {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let msg = take_string(&mut fields, "msg");
        let namespace = take_string(&mut fields, "namespace");
        let correlation_id = take_string(&mut fields, "correlationId");
        let error_code = match fields.remove("errorCode") {
            None | Some(Value::Null) => None,
            Some(Value::String(code)) => Some(code),
            Some(other) => Some(other.to_string()),
        };
        for key in RESERVED_KEYS {
            fields.remove(*key);
        }
        Self {
            level,
            msg,
            namespace,
            correlation_id,
            error_code,
            timestamp,
            fields,
        }
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> String {
    match fields.remove(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_redacted_splits_fields() {
        let record = json!({
            "level": "warn",
            "msg": "disk low",
            "namespace": "api:db",
            "correlationId": "c-1",
            "errorCode": 507,
            "freeBytes": 12,
        });
        let entry = LogEntry::from_redacted(Level::Warn, record, Utc::now());
        assert_eq!(entry.msg, "disk low");
        assert_eq!(entry.namespace, "api:db");
        assert_eq!(entry.correlation_id, "c-1");
        assert_eq!(entry.error_code.as_deref(), Some("507"));
        assert_eq!(entry.fields, json!({"freeBytes": 12}).as_object().unwrap().clone());
    }

    #[test]
    fn test_reserved_keys_never_remain_in_fields() {
        let mut record = serde_json::Map::new();
        for key in RESERVED_KEYS {
            record.insert(key.to_string(), json!("x"));
        }
        record.insert("extra".to_string(), json!(1));
        let entry = LogEntry::from_redacted(Level::Debug, Value::Object(record), Utc::now());
        assert_eq!(entry.fields.len(), 1);
        assert!(RESERVED_KEYS.iter().all(|key| !entry.fields.contains_key(*key)));
    }

    #[test]
    fn test_serialized_shape() {
        let entry = LogEntry::from_redacted(
            Level::Info,
            json!({"msg": "hi", "user": "ada"}),
            Utc::now(),
        );
        let value = serde_json::to_value(&entry).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["correlationId", "errorCode", "level", "msg", "namespace", "timestamp", "user"]
        );
        assert_eq!(value["errorCode"], Value::Null);
        assert_eq!(value["correlationId"], "");
    }

    #[test]
    fn test_round_trip_keeps_bound_fields() {
        let entry = LogEntry::from_redacted(
            Level::Error,
            json!({"msg": "boom", "requestId": "r-9"}),
            Utc::now(),
        );
        let line = entry.to_json_line().unwrap();
        let parsed: LogEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, entry);
    }
}
