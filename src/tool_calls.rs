//! Per-call tool state, advanced by ingesting protocol events.
//!
//! Each call moves `running -> completed` or `running -> error` and never
//! back. Events that do not fit that machine (unknown ids, calls already in
//! a terminal state, repeated starts, malformed payloads) are dropped and
//! counted in [`DropStats`], never raised.

use crate::error::EventError;
use crate::events::{AgentMessage, ProtocolEvent};
use crate::partial_json::reconstruct;
use crate::textutil::single_line_preview;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Max characters of a fragment echoed into trace logs.
const FRAGMENT_PREVIEW_CHARS: usize = 80;

/// Lifecycle of one tool call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Running,
    Completed,
    Error,
}

impl ToolCallStatus {
    /// Terminal states are sticky: later events for the call are ignored.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// State of one in-flight or finished tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallState {
    pub id: String,
    pub name: String,
    pub status: ToolCallStatus,
    /// Every argument fragment received so far, in arrival order.
    pub args_buffer: String,
    /// Best-effort arguments for the current buffer.
    pub args: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallState {
    fn started(id: String, name: String) -> Self {
        Self {
            id,
            name,
            status: ToolCallStatus::Running,
            args_buffer: String::new(),
            args: Value::Object(Map::new()),
            result: None,
            error: None,
        }
    }

    fn append(&mut self, fragment: &str) {
        self.args_buffer.push_str(fragment);
        self.args = reconstruct(&self.args_buffer);
    }
}

/// Point-in-time copy of every tracked call, keyed by id.
pub type ToolCallSnapshot = BTreeMap<String, ToolCallState>;

/// Why an event was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    /// Delta/complete/error for an id that never started.
    UnknownId(String),
    /// The call already completed or failed.
    Terminal { id: String, status: ToolCallStatus },
    /// A second `tool_start` for a known id.
    DuplicateStart(String),
    /// The payload could not be decoded.
    Malformed(EventError),
}

/// Result of ingesting one event.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Started(String),
    Updated(String),
    Completed(String),
    Failed(String),
    Dropped(DropReason),
    /// Non tool-call event handed back to the caller untouched.
    Passthrough(AgentMessage),
}

impl IngestOutcome {
    /// True when tool-call state changed and subscribers should hear about it.
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            Self::Started(_) | Self::Updated(_) | Self::Completed(_) | Self::Failed(_)
        )
    }
}

/// Counters for dropped events, for host-side observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropStats {
    pub unknown_id: u64,
    pub terminal: u64,
    pub duplicate_start: u64,
    pub malformed: u64,
}

impl DropStats {
    pub fn total(&self) -> u64 {
        self.unknown_id
            .saturating_add(self.terminal)
            .saturating_add(self.duplicate_start)
            .saturating_add(self.malformed)
    }

    fn record(&mut self, reason: &DropReason) {
        let slot = match reason {
            DropReason::UnknownId(_) => &mut self.unknown_id,
            DropReason::Terminal { .. } => &mut self.terminal,
            DropReason::DuplicateStart(_) => &mut self.duplicate_start,
            DropReason::Malformed(_) => &mut self.malformed,
        };
        *slot = slot.saturating_add(1);
    }
}

/// Tool-call state machine for one conversation.
#[derive(Debug, Default)]
pub struct ToolCallTracker {
    calls: HashMap<String, ToolCallState>,
    last_activity: HashMap<String, Instant>,
    idle_timeout: Option<Duration>,
    drops: DropStats,
}

impl ToolCallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker whose `expire_idle` fails calls quiet for longer than `timeout`.
    pub fn with_idle_timeout(timeout: Option<Duration>) -> Self {
        Self {
            idle_timeout: timeout,
            ..Self::default()
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    pub fn set_idle_timeout(&mut self, timeout: Option<Duration>) {
        self.idle_timeout = timeout;
    }

    /// Advance state with one event.
    pub fn ingest(&mut self, event: ProtocolEvent) -> IngestOutcome {
        self.ingest_at(event, Instant::now())
    }

    /// Like [`ingest`](Self::ingest) with an explicit activity timestamp.
    pub fn ingest_at(&mut self, event: ProtocolEvent, now: Instant) -> IngestOutcome {
        let outcome = match event {
            ProtocolEvent::ToolStart { id, name } => self.start(id, name),
            ProtocolEvent::ToolDelta { id, delta } => {
                self.with_running(id, |state| {
                    trace!(
                        id = %state.id,
                        fragment = %single_line_preview(&delta, FRAGMENT_PREVIEW_CHARS),
                        "tool call delta"
                    );
                    state.append(&delta);
                    IngestOutcome::Updated(state.id.clone())
                })
            }
            ProtocolEvent::ToolComplete { id, result, delta } => self.with_running(id, |state| {
                if let Some(delta) = delta {
                    state.args_buffer.push_str(&delta);
                }
                state.args = reconstruct(&state.args_buffer);
                state.status = ToolCallStatus::Completed;
                state.result = Some(result);
                debug!(id = %state.id, name = %state.name, "tool call completed");
                IngestOutcome::Completed(state.id.clone())
            }),
            ProtocolEvent::ToolError { id, message } => self.with_running(id, |state| {
                debug!(id = %state.id, name = %state.name, error = %message, "tool call failed");
                state.status = ToolCallStatus::Error;
                state.error = Some(message);
                IngestOutcome::Failed(state.id.clone())
            }),
            ProtocolEvent::AgentMessage(message) => IngestOutcome::Passthrough(message),
        };

        match &outcome {
            IngestOutcome::Started(id) | IngestOutcome::Updated(id) => {
                self.last_activity.insert(id.clone(), now);
            }
            IngestOutcome::Completed(id) | IngestOutcome::Failed(id) => {
                self.last_activity.remove(id);
            }
            IngestOutcome::Dropped(reason) => self.record_drop(reason),
            IngestOutcome::Passthrough(_) => {}
        }
        outcome
    }

    /// Count a payload that never decoded into an event.
    pub fn record_malformed(&mut self, error: EventError) -> IngestOutcome {
        let reason = DropReason::Malformed(error);
        self.record_drop(&reason);
        IngestOutcome::Dropped(reason)
    }

    fn start(&mut self, id: String, name: String) -> IngestOutcome {
        if self.calls.contains_key(&id) {
            return IngestOutcome::Dropped(DropReason::DuplicateStart(id));
        }
        debug!(id = %id, name = %name, "tool call started");
        self.calls
            .insert(id.clone(), ToolCallState::started(id.clone(), name));
        IngestOutcome::Started(id)
    }

    fn with_running<F>(&mut self, id: String, apply: F) -> IngestOutcome
    where
        F: FnOnce(&mut ToolCallState) -> IngestOutcome,
    {
        match self.calls.get_mut(&id) {
            None => IngestOutcome::Dropped(DropReason::UnknownId(id)),
            Some(state) if state.status.is_terminal() => {
                IngestOutcome::Dropped(DropReason::Terminal {
                    id,
                    status: state.status,
                })
            }
            Some(state) => apply(state),
        }
    }

    fn record_drop(&mut self, reason: &DropReason) {
        self.drops.record(reason);
        match reason {
            DropReason::UnknownId(id) => {
                warn!(id = %id, "dropping tool event for unknown call id")
            }
            DropReason::Terminal { id, status } => {
                warn!(id = %id, status = ?status, "dropping tool event for finished call")
            }
            DropReason::DuplicateStart(id) => {
                warn!(id = %id, "dropping duplicate tool_start")
            }
            DropReason::Malformed(error) => warn!(error = %error, "dropping malformed event"),
        }
    }

    /// Fail every running call idle for longer than the configured timeout.
    ///
    /// Returns the ids that moved to `error`. Without a timeout this is a
    /// no-op.
    pub fn expire_idle(&mut self, now: Instant) -> Vec<String> {
        let Some(timeout) = self.idle_timeout else {
            return Vec::new();
        };
        let mut expired: Vec<String> = self
            .last_activity
            .iter()
            .filter(|(_, seen)| now.saturating_duration_since(**seen) > timeout)
            .map(|(id, _)| id.clone())
            .collect();
        expired.sort();

        for id in &expired {
            self.last_activity.remove(id);
            if let Some(state) = self.calls.get_mut(id) {
                if state.status == ToolCallStatus::Running {
                    warn!(id = %id, timeout_secs = timeout.as_secs(), "tool call idle timeout");
                    state.status = ToolCallStatus::Error;
                    state.error = Some("idle timeout".to_string());
                }
            }
        }
        expired
    }

    pub fn get(&self, id: &str) -> Option<&ToolCallState> {
        self.calls.get(id)
    }

    pub fn snapshot(&self) -> ToolCallSnapshot {
        self.calls
            .iter()
            .map(|(id, state)| (id.clone(), state.clone()))
            .collect()
    }

    pub fn drop_stats(&self) -> DropStats {
        self.drops
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Forget every call, e.g. when the owning conversation is cleared.
    pub fn clear(&mut self) {
        self.calls.clear();
        self.last_activity.clear();
    }
}
