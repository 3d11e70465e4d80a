use futures::channel::mpsc;
use serde::{Serialize, Deserialize};

/// Append-only record of engine activity, pushed to the boundary layer
/// for archival. Nothing in the engine reads these back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub at_ms: u64,
    pub kind: EventKind,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Load,
    Round,
    Action,
    Complete,
    Score,
}

/// Best-effort writer: a missing or closed sink drops records silently.
pub(crate) struct EventLog {
    sink: Option<mpsc::UnboundedSender<EventRecord>>,
}

impl EventLog {
    pub(crate) fn new(sink: Option<mpsc::UnboundedSender<EventRecord>>) -> Self {
        Self { sink }
    }

    pub(crate) fn record(&self, at_ms: u64, kind: EventKind, payload: serde_json::Value) {
        if let Some(sink) = &self.sink {
            let _ = sink.unbounded_send(EventRecord { at_ms, kind, payload });
        }
    }
}
