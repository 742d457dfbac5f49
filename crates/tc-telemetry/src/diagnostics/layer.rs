//! JSON-lines tracing layer for the core's diagnostics.
//!
//! Writes one object per tracing event to the wrapped writer (stderr by
//! default). String fields and the message run through the secret patterns of
//! the redaction engine, so diagnostics about a failed transport cannot leak a
//! token that appeared in an error message.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use tc_redact::{RedactionConfig, Redactor};

/// Correlation id recorded on a span.
#[derive(Debug, Clone, Default)]
struct SpanCorrelation(Option<String>);

struct SpanVisitor {
    correlation_id: Option<String>,
}

impl tracing::field::Visit for SpanVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "correlation_id" {
            self.correlation_id = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "correlation_id" {
            self.correlation_id = Some(format!("{:?}", value));
        }
    }
}

/// Extracts event fields, redacting strings.
struct FieldVisitor<'a> {
    redactor: &'a Redactor,
    fields: Map<String, Value>,
    message: Option<String>,
}

impl FieldVisitor<'_> {
    fn record_text(&mut self, field: &tracing::field::Field, text: &str) {
        let redacted = self.redactor.redact_str(text);
        if field.name() == "message" {
            self.message = Some(redacted);
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(redacted));
        }
    }
}

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.record_text(field, value);
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.record_text(field, &format!("{:?}", value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.fields.insert(field.name().to_string(), Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::Bool(value));
    }
}

/// JSONL tracing layer.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
    redactor: Redactor,
}

impl JsonlLayer<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> JsonlLayer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            redactor: Redactor::new(RedactionConfig::default()),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = SpanVisitor {
            correlation_id: None,
        };
        attrs.record(&mut visitor);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut()
                .insert(SpanCorrelation(visitor.correlation_id));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let ts = Utc::now();

        // Innermost span with a correlation id wins.
        let mut correlation_id = None;
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(SpanCorrelation(Some(id))) = span.extensions().get::<SpanCorrelation>() {
                    correlation_id = Some(id.clone());
                    break;
                }
            }
        }

        let mut visitor = FieldVisitor {
            redactor: &self.redactor,
            fields: Map::new(),
            message: None,
        };
        event.record(&mut visitor);

        let metadata = event.metadata();
        let mut obj = Map::new();
        obj.insert("ts".to_string(), json!(ts.to_rfc3339()));
        obj.insert(
            "level".to_string(),
            json!(metadata.level().as_str().to_lowercase()),
        );
        obj.insert("target".to_string(), json!(metadata.target()));
        if let Some(msg) = visitor.message {
            obj.insert("message".to_string(), json!(msg));
        }
        if let Some(id) = correlation_id {
            obj.insert("correlation_id".to_string(), json!(id));
        }
        if !visitor.fields.is_empty() {
            obj.insert("fields".to_string(), Value::Object(visitor.fields));
        }

        let line = Value::Object(obj).to_string();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}
