//! Tracing layer that renders each event as one JSON line.
//!
//! Line shape:
//!
//! ```json
//! {"ts":"2024-05-01T10:00:00.000000Z","level":"INFO","service":"cli","pid":4242,
//!  "target":"devconnect_session::client","msg":"Login successful",
//!  "fields":{"username":"alice"},"spans":["login"],"src":"crates/.../client.rs:512"}
//! ```

use crate::redact::sanitize_value;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

#[derive(Debug, Serialize)]
struct LogLine<'a> {
    ts: String,
    level: &'static str,
    service: &'a str,
    pid: u32,
    target: &'a str,
    msg: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    fields: BTreeMap<&'static str, Value>,
    /// Enclosing spans, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    spans: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    src: Option<String>,
}

/// Collects event fields, redacting credentials as they arrive.
struct FieldCollector {
    redact: bool,
    msg: String,
    fields: BTreeMap<&'static str, Value>,
}

impl FieldCollector {
    fn new(redact: bool) -> Self {
        Self {
            redact,
            msg: String::new(),
            fields: BTreeMap::new(),
        }
    }

    fn insert(&mut self, field: &Field, value: Value) {
        let name = field.name();
        if name == "message" {
            self.msg = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            return;
        }

        let value = if self.redact {
            sanitize_value(name, &value)
        } else {
            value
        };
        self.fields.insert(name, value);
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.insert(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }
}

/// Writes one JSON object per event to `make_writer`.
pub struct JsonLayer<W> {
    service: String,
    pid: u32,
    redact: bool,
    make_writer: W,
}

impl<W> JsonLayer<W> {
    pub fn new(service: impl Into<String>, make_writer: W, redact: bool) -> Self {
        Self {
            service: service.into(),
            pid: std::process::id(),
            redact,
            make_writer,
        }
    }
}

impl<S, W> Layer<S> for JsonLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut collector = FieldCollector::new(self.redact);
        event.record(&mut collector);

        let metadata = event.metadata();
        let spans = ctx
            .event_scope(event)
            .map(|scope| scope.from_root().map(|span| span.name()).collect())
            .unwrap_or_default();
        let src = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
            (Some(file), None) => Some(file.to_string()),
            _ => None,
        };

        let line = LogLine {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            level: metadata.level().as_str(),
            service: &self.service,
            pid: self.pid,
            target: metadata.target(),
            msg: collector.msg,
            fields: collector.fields,
            spans,
            src,
        };

        if let Ok(json) = serde_json::to_string(&line) {
            let _ = writeln!(self.make_writer.make_writer(), "{}", json);
        }
    }
}
