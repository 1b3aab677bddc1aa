use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::io::Write;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Boot,
    PortSwitch,
    HoneypotCapture,
    ConsequenceUpdate,
    Sleep,
    Failure,
    RetryBackoff,
    ProtectiveSilence,
    Halt,
    Shutdown,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Boot,
        EventKind::PortSwitch,
        EventKind::HoneypotCapture,
        EventKind::ConsequenceUpdate,
        EventKind::Sleep,
        EventKind::Failure,
        EventKind::RetryBackoff,
        EventKind::ProtectiveSilence,
        EventKind::Halt,
        EventKind::Shutdown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Boot => "boot",
            EventKind::PortSwitch => "port_switch",
            EventKind::HoneypotCapture => "honeypot_capture",
            EventKind::ConsequenceUpdate => "consequence_update",
            EventKind::Sleep => "sleep",
            EventKind::Failure => "failure",
            EventKind::RetryBackoff => "retry_backoff",
            EventKind::ProtectiveSilence => "protective_silence",
            EventKind::Halt => "halt",
            EventKind::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded event, stamped by the sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "event")]
    pub kind: EventKind,
    pub payload: Value,
}

impl Event {
    pub fn stamp(kind: EventKind, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            payload,
        }
    }
}

/// Boundary the loop reports through. Synchronous and infallible from the
/// caller's side; a sink deals with its own I/O errors.
pub trait EventSink {
    fn record(&mut self, kind: EventKind, payload: Value);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record(&mut self, kind: EventKind, payload: Value) {
        (**self).record(kind, payload)
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn record(&mut self, kind: EventKind, payload: Value) {
        (**self).record(kind, payload)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Vec<Event>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.iter().map(|e| e.kind).collect()
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, kind: EventKind, payload: Value) {
        self.events.push(Event::stamp(kind, payload));
    }
}

/// Writes one JSON object per line. Write errors are logged and counted,
/// never surfaced to the loop.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
    write_errors: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            write_errors: 0,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_event(&mut self, event: &Event) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn record(&mut self, kind: EventKind, payload: Value) {
        let event = Event::stamp(kind, payload);
        match self.write_event(&event) {
            Ok(()) => self.written += 1,
            Err(err) => {
                self.write_errors += 1;
                tracing::warn!(event = %kind, error = %err, "event journal write failed");
            }
        }
    }
}
