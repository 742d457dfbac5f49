//! Integration tests for tc-logger.
//!
//! These tests verify:
//! - Escalated entries pass through the event bus's own redaction
//! - Entries fall back to the tracing sink when no transport is registered
//! - Async log transports are drained

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tc_common::Delivery;
use tc_events::{Event, EventBus, EventsConfigPatch};
use tc_logger::{LogEntry, Logger, LoggerConfig};

#[derive(Clone)]
struct BufWriter(Arc<Mutex<Vec<u8>>>);

impl Write for BufWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Escalation
// ============================================================================

#[test]
fn test_escalation_applies_bus_redaction() {
    let bus = Arc::new(EventBus::new().unwrap());
    bus.configure_events(EventsConfigPatch::new().add_redact_patterns([r"internal-\d+"]))
        .unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    bus.add_transport(move |event: &Event| {
        sink.lock().unwrap().push(event.clone());
        Delivery::Done
    });

    let logger = Logger::with_bus(LoggerConfig::default(), Arc::clone(&bus));
    logger.add_log_transport(|_: &LogEntry| Delivery::Done);

    let entry = logger.error("host internal-42 unreachable", Value::Null).unwrap();
    assert_eq!(entry.msg, "host internal-42 unreachable");

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "log.error");
    assert_eq!(events[0].payload["msg"], "host [REDACTED] unreachable");
    assert_eq!(bus.metrics().emitted("log.error"), 1);
}

#[test]
fn test_warn_escalates_as_log_warn() {
    let bus = Arc::new(EventBus::new().unwrap());
    let logger = Logger::with_bus(LoggerConfig::default(), Arc::clone(&bus));
    logger.add_log_transport(|_: &LogEntry| Delivery::Done);

    logger.warn("slow query", json!({"ms": 900}));
    logger.debug("not escalated", Value::Null);

    assert_eq!(bus.metrics().emitted("log.warn"), 1);
    assert_eq!(bus.metrics().emitted("log.error"), 0);
}

// ============================================================================
// Default sink
// ============================================================================

#[test]
fn test_default_sink_writes_through_tracing() {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let writer = BufWriter(Arc::clone(&buffer));
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let logger = Logger::new(LoggerConfig::default()).namespace("sink");
    tracing::subscriber::with_default(subscriber, || {
        logger.warn("disk nearly full", json!({"token": "abc"}));
    });

    let output = String::from_utf8_lossy(&buffer.lock().unwrap()).to_string();
    assert!(output.contains("tc_logger::sink"));
    assert!(output.contains("disk nearly full"));
    assert!(output.contains("[REDACTED]"));
    assert!(!output.contains("\"abc\""));
}

// ============================================================================
// Drain
// ============================================================================

#[tokio::test]
async fn test_drain_times_out_on_hanging_transport() {
    let logger = Logger::new(LoggerConfig::default());
    logger.add_log_transport(|_: &LogEntry| Delivery::pending(std::future::pending()));

    logger.info("a", Value::Null);
    assert!(!logger.drain_logs(Duration::from_millis(20)).await);
    assert_eq!(logger.pending_log_transports_count(), 1);
}

#[tokio::test]
async fn test_children_share_pending_set() {
    let logger = Logger::new(LoggerConfig::default());
    logger.add_log_transport(|_: &LogEntry| {
        Delivery::pending(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        })
    });

    logger.namespace("a").info("x", Value::Null);
    logger.with(json!({"k": 1})).error("y", Value::Null);
    assert_eq!(logger.pending_log_transports_count(), 2);
    assert!(logger.drain_logs(Duration::from_secs(1)).await);
    assert_eq!(logger.pending_log_transports_count(), 0);
}
