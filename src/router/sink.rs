//! Event sinks.

use std::io::Write;
use std::sync::Mutex;

use k8s_openapi::api::core::v1::Event;
use serde::Serialize;

/// Names accepted by [`from_name`].
pub const SINK_NAMES: &[&str] = &["glog", "log", "stdout"];

/// Error type for sink construction.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("unknown sink {0:?}")]
    Unknown(String),
}

/// Destination for observed events.
///
/// `old` is set when the event replaces a previously seen version.
pub trait EventSink: Send + Sync {
    fn update_events(&self, new: &Event, old: Option<&Event>);
}

/// Build the sink registered under `name`.
pub fn from_name(name: &str) -> Result<Box<dyn EventSink>, SinkError> {
    match name {
        "glog" | "log" => Ok(Box::new(LogSink)),
        "stdout" => Ok(Box::new(StdoutSink::new(std::io::stdout()))),
        other => Err(SinkError::Unknown(other.to_string())),
    }
}

#[derive(Serialize)]
struct EventData<'a> {
    verb: &'static str,
    event: &'a Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_event: Option<&'a Event>,
}

impl<'a> EventData<'a> {
    fn new(new: &'a Event, old: Option<&'a Event>) -> Self {
        Self {
            verb: if old.is_some() { "UPDATED" } else { "ADDED" },
            event: new,
            old_event: old,
        }
    }
}

/// Writes each event as a structured log record.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn update_events(&self, new: &Event, old: Option<&Event>) {
        let data = EventData::new(new, old);
        match serde_json::to_string(&data) {
            Ok(json) => tracing::info!(target: "eventrouter::sink", verb = data.verb, "{json}"),
            Err(e) => tracing::warn!(error = %e, "Failed to encode event"),
        }
    }
}

/// Writes one JSON document per line.
pub struct StdoutSink<W> {
    out: Mutex<W>,
}

impl<W: Write> StdoutSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> EventSink for StdoutSink<W> {
    fn update_events(&self, new: &Event, old: Option<&Event>) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let written = serde_json::to_writer(&mut *out, &EventData::new(new, old))
            .map_err(std::io::Error::from)
            .and_then(|_| out.write_all(b"\n"));
        if let Err(e) = written {
            tracing::warn!(error = %e, "Failed to write event");
        }
    }
}
