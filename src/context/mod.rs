//! Readable context: application state the agent may read.
//!
//! Owners register entries as they appear and unregister them as they go
//! away; a [`ContextStrategy`] renders the current set into prompt text.

mod registry;
mod strategy;

pub use registry::ContextRegistry;
pub use strategy::{ContextStrategy, FlatStrategy, StrategyKind, TreeStrategy};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One named piece of state exposed to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadableContext {
    pub id: String,
    pub value: Value,
    /// Human label used in rendered prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parent entry, used by the tree strategy to group and prune.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl ReadableContext {
    pub fn new(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            value,
            description: None,
            parent_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}
