//! Registry of available actions, keyed by name.

use super::declaration::{self, FunctionDeclaration};
use super::{ActionDefinition, ActionHandler};
use crate::types::ToolDefinition;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Actions in registration order, unique by name.
///
/// Tokens work as in the context registry: re-registering a name replaces
/// the previous action and invalidates its token.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<u64, ActionDefinition>,
    index: HashMap<String, u64>,
    next_token: u64,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an action. Returns the registration token.
    pub fn register(&mut self, action: ActionDefinition) -> u64 {
        let token = self.next_token;
        self.next_token = self.next_token.saturating_add(1);
        if let Some(previous) = self.index.insert(action.name().to_string(), token) {
            debug!(action = %action.name(), "replacing registered action");
            self.actions.remove(&previous);
        }
        self.actions.insert(token, action);
        token
    }

    /// Remove `name` if it is still held by the registration `token`.
    pub fn unregister(&mut self, name: &str, token: u64) -> bool {
        if self.index.get(name) != Some(&token) {
            return false;
        }
        self.index.remove(name);
        self.actions.remove(&token).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&ActionDefinition> {
        self.index.get(name).and_then(|token| self.actions.get(token))
    }

    /// Shared handle to an action's handler, usable after the registry
    /// borrow ends.
    pub fn handler(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.get(name).map(ActionDefinition::handler)
    }

    /// Declarations for every action, in registration order.
    pub fn function_declarations(&self) -> Vec<FunctionDeclaration> {
        self.actions
            .values()
            .map(|action| FunctionDeclaration::from_schema(&action.schema))
            .collect()
    }

    /// OpenAI-compatible tool definitions for every action.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.actions
            .values()
            .map(|action| declaration::tool_definition(&action.schema))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
