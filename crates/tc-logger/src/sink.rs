//! Fallback sink used when no log transport is registered.
//!
//! Entries are forwarded to `tracing` under the `tc_logger::sink` target at
//! the entry's level, so they end up wherever the process subscriber writes.
//! The logger has already applied its own level gate, so a subscriber filter
//! stricter than the logger level hides entries a second time; pass
//! `tc_logger::sink=debug` in the filter directive to avoid that.
//!
//! With no subscriber in scope the JSON line goes straight to stderr.

use std::io::{self, Write};

use tracing::subscriber::NoSubscriber;
use tracing::{debug, error, info, warn};

use tc_common::Level;

use crate::LogEntry;

/// Target used for entries written by the fallback sink.
pub const SINK_TARGET: &str = "tc_logger::sink";

/// Write one entry through `tracing`, or to stderr when nothing listens.
pub fn write_entry(entry: &LogEntry) {
    write_entry_or(entry, io::stderr);
}

pub(crate) fn write_entry_or<W, F>(entry: &LogEntry, fallback: F)
where
    W: Write,
    F: FnOnce() -> W,
{
    let line = match entry.to_json_line() {
        Ok(line) => line,
        Err(err) => {
            warn!(error = %err, "failed to serialize log entry");
            return;
        }
    };
    if !subscriber_in_scope() {
        let _ = writeln!(fallback(), "{}", line);
        return;
    }
    match entry.level {
        Level::Debug => debug!(target: SINK_TARGET, "{}", line),
        Level::Info => info!(target: SINK_TARGET, "{}", line),
        Level::Warn => warn!(target: SINK_TARGET, "{}", line),
        Level::Error => error!(target: SINK_TARGET, "{}", line),
    }
}

fn subscriber_in_scope() -> bool {
    tracing::dispatcher::get_default(|dispatch| !dispatch.is::<NoSubscriber>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn entry(level: Level) -> LogEntry {
        LogEntry::from_redacted(level, json!({"msg": "disk low", "free": 3}), Utc::now())
    }

    #[test]
    fn test_stderr_fallback_without_subscriber() {
        let mut out = Vec::new();
        let writer = &mut out;
        tracing::subscriber::with_default(NoSubscriber::default(), || {
            write_entry_or(&entry(Level::Warn), move || writer);
        });

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(parsed["msg"], "disk low");
        assert_eq!(parsed["level"], "warn");
    }

    #[test]
    fn test_subscriber_in_scope_bypasses_fallback() {
        let mut out = Vec::new();
        let subscriber = tracing_subscriber::fmt().with_writer(io::sink).finish();
        let writer = &mut out;
        tracing::subscriber::with_default(subscriber, || {
            write_entry_or(&entry(Level::Info), move || writer);
        });
        assert!(out.is_empty());
    }
}
