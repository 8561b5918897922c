//! Inbound protocol events.
//!
//! Events arrive from an external transport as JSON objects tagged by
//! `type`. Decoding is tolerant of extra fields but strict about the fields
//! each event kind needs: anything short of that becomes an [`EventError`]
//! diagnostic that the client counts and drops.

use crate::error::EventError;
use serde::Serialize;
use serde_json::{Map, Value};

/// One decoded protocol event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// A new tool call began.
    ToolStart { id: String, name: String },
    /// Another fragment of the call's JSON arguments.
    ToolDelta { id: String, delta: String },
    /// The call finished. Some transports flush a last fragment here.
    ToolComplete {
        id: String,
        result: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        delta: Option<String>,
    },
    /// The call failed on the agent side.
    ToolError { id: String, message: String },
    /// Agent text output. Not part of tool-call state.
    AgentMessage(AgentMessage),
}

/// An `agent_message` payload, kept verbatim minus the `type` tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentMessage {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AgentMessage {
    /// Convenience accessor for the common `content` text field.
    pub fn content(&self) -> Option<&str> {
        self.fields.get("content").and_then(Value::as_str)
    }
}

impl ProtocolEvent {
    pub fn tool_start(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ToolStart {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn tool_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::ToolDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn tool_complete(id: impl Into<String>, result: Value) -> Self {
        Self::ToolComplete {
            id: id.into(),
            result,
            delta: None,
        }
    }

    pub fn tool_error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolError {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolStart { .. } => "tool_start",
            Self::ToolDelta { .. } => "tool_delta",
            Self::ToolComplete { .. } => "tool_complete",
            Self::ToolError { .. } => "tool_error",
            Self::AgentMessage(_) => "agent_message",
        }
    }

    /// Tool-call id this event refers to, if any.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::ToolStart { id, .. }
            | Self::ToolDelta { id, .. }
            | Self::ToolComplete { id, .. }
            | Self::ToolError { id, .. } => Some(id),
            Self::AgentMessage(_) => None,
        }
    }

    /// Decode one event from raw JSON text.
    pub fn from_json(raw: &str) -> Result<Self, EventError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Decode one event from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        let Value::Object(mut object) = value else {
            return Err(EventError::NotAnObject);
        };
        let kind = match object.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(EventError::MissingType),
        };

        match kind.as_str() {
            "tool_start" => Ok(Self::ToolStart {
                id: take_string(&mut object, "tool_start", "id")?,
                name: take_string(&mut object, "tool_start", "name")?,
            }),
            "tool_delta" => Ok(Self::ToolDelta {
                id: take_string(&mut object, "tool_delta", "id")?,
                delta: take_string(&mut object, "tool_delta", "delta")?,
            }),
            "tool_complete" => {
                let id = take_string(&mut object, "tool_complete", "id")?;
                // Any JSON value is a valid result, `null` included; only
                // an absent key is malformed.
                let result = object.remove("result").ok_or(EventError::MissingField {
                    event_type: "tool_complete",
                    field: "result",
                })?;
                let delta = match object.remove("delta") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(delta)) => Some(delta),
                    Some(_) => {
                        return Err(EventError::MissingField {
                            event_type: "tool_complete",
                            field: "delta",
                        })
                    }
                };
                Ok(Self::ToolComplete {
                    id,
                    result,
                    delta,
                })
            }
            "tool_error" => Ok(Self::ToolError {
                id: take_string(&mut object, "tool_error", "id")?,
                message: take_string(&mut object, "tool_error", "message")?,
            }),
            "agent_message" => Ok(Self::AgentMessage(AgentMessage { fields: object })),
            _ => Err(EventError::UnknownType(kind)),
        }
    }
}

fn take_string(
    object: &mut Map<String, Value>,
    event_type: &'static str,
    field: &'static str,
) -> Result<String, EventError> {
    match object.remove(field) {
        Some(Value::String(text)) => Ok(text),
        _ => Err(EventError::MissingField { event_type, field }),
    }
}
