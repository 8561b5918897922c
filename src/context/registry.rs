//! Ordered registry of readable context entries.

use super::ReadableContext;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Readable contexts in registration order, unique by id.
///
/// Every registration gets a token. Re-registering an id replaces the old
/// entry (it moves to the end of the order), and the old token stops
/// working so a stale owner cannot remove its replacement.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    entries: BTreeMap<u64, ReadableContext>,
    index: HashMap<String, u64>,
    next_token: u64,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry. Returns the registration token.
    pub fn register(&mut self, context: ReadableContext) -> u64 {
        let token = self.next_token;
        self.next_token = self.next_token.saturating_add(1);
        if let Some(previous) = self.index.insert(context.id.clone(), token) {
            self.entries.remove(&previous);
        }
        self.entries.insert(token, context);
        token
    }

    /// Remove `id` if it is still held by the registration `token`.
    pub fn unregister(&mut self, id: &str, token: u64) -> bool {
        if self.index.get(id) != Some(&token) {
            return false;
        }
        self.index.remove(id);
        self.entries.remove(&token).is_some()
    }

    /// Replace the value of an entry in place. False when `id` is unknown.
    pub fn update(&mut self, id: &str, value: Value) -> bool {
        let Some(token) = self.index.get(id) else {
            return false;
        };
        match self.entries.get_mut(token) {
            Some(entry) => {
                entry.value = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&ReadableContext> {
        self.index.get(id).and_then(|token| self.entries.get(token))
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ReadableContext> {
        self.entries.values()
    }

    /// Cloned entries in registration order.
    pub fn contexts(&self) -> Vec<ReadableContext> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(registry: &ContextRegistry) -> Vec<String> {
        registry.iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn keeps_registration_order() {
        let mut registry = ContextRegistry::new();
        registry.register(ReadableContext::new("b", json!(1)));
        registry.register(ReadableContext::new("a", json!(2)));
        registry.register(ReadableContext::new("c", json!(3)));
        assert_eq!(ids(&registry), vec!["b", "a", "c"]);
    }

    #[test]
    fn reregistering_replaces_and_invalidates_old_token() {
        let mut registry = ContextRegistry::new();
        let first = registry.register(ReadableContext::new("doc", json!("v1")));
        registry.register(ReadableContext::new("other", json!(0)));
        let second = registry.register(ReadableContext::new("doc", json!("v2")));

        assert_eq!(registry.len(), 2);
        assert_eq!(ids(&registry), vec!["other", "doc"]);
        assert_eq!(registry.get("doc").unwrap().value, json!("v2"));

        assert!(!registry.unregister("doc", first));
        assert!(registry.get("doc").is_some());
        assert!(registry.unregister("doc", second));
        assert!(registry.get("doc").is_none());
    }

    #[test]
    fn update_changes_value_in_place() {
        let mut registry = ContextRegistry::new();
        registry.register(ReadableContext::new("a", json!(1)).with_description("first"));
        registry.register(ReadableContext::new("b", json!(2)));
        assert!(registry.update("a", json!({"n": 10})));
        assert!(!registry.update("missing", json!(0)));

        let a = registry.get("a").unwrap();
        assert_eq!(a.value, json!({"n": 10}));
        assert_eq!(a.description.as_deref(), Some("first"));
        assert_eq!(ids(&registry), vec!["a", "b"]);
    }

    #[test]
    fn unregister_unknown_is_false() {
        let mut registry = ContextRegistry::new();
        assert!(!registry.unregister("nope", 0));
        assert!(registry.is_empty());
    }
}
