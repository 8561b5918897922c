//! Shared test fixtures for client and tool-call test modules.

use crate::events::ProtocolEvent;
use crate::tool_calls::ToolCallSnapshot;
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Subscriber that records every snapshot it is handed.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    seen: Arc<Mutex<Vec<ToolCallSnapshot>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback to pass to `Client::subscribe`.
    pub fn listener(&self) -> impl Fn(&ToolCallSnapshot) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |snapshot: &ToolCallSnapshot| {
            seen.lock()
                .expect("recording listener lock")
                .push(snapshot.clone());
        }
    }

    pub fn snapshots(&self) -> Vec<ToolCallSnapshot> {
        self.seen.lock().expect("recording listener lock").clone()
    }

    pub fn last(&self) -> Option<ToolCallSnapshot> {
        self.snapshots().pop()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().expect("recording listener lock").len()
    }
}

/// `search` call with arguments split mid-string, then completed.
pub fn search_call_events(id: &str) -> Vec<ProtocolEvent> {
    vec![
        ProtocolEvent::tool_start(id, "search"),
        ProtocolEvent::tool_delta(id, r#"{"q":"ab"#),
        ProtocolEvent::tool_delta(id, r#"c"}"#),
        ProtocolEvent::tool_complete(id, json!("ok")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;

    #[test]
    fn recording_listener_captures_each_notification() {
        let client = Client::new();
        let recorder = RecordingListener::new();
        client.subscribe(recorder.listener());
        for event in search_call_events("1") {
            client.ingest(event);
        }
        assert_eq!(recorder.len(), 5);
        assert!(recorder.snapshots()[0].is_empty());
        assert_eq!(recorder.last().unwrap()["1"].result, Some(json!("ok")));
    }
}
