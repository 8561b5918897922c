//! Prompt rendering strategies for readable contexts.

use super::ReadableContext;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Indentation stops growing past this many levels.
const MAX_INDENT_DEPTH: usize = 32;

/// Turns the registered contexts into prompt text.
///
/// `contexts` is in registration order. `focus` names the entry the agent is
/// currently working with; strategies are free to ignore it.
pub trait ContextStrategy: Send + Sync {
    fn build_prompt(&self, contexts: &[ReadableContext], focus: Option<&str>) -> String;
}

/// Every context, in registration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatStrategy;

impl ContextStrategy for FlatStrategy {
    fn build_prompt(&self, contexts: &[ReadableContext], _focus: Option<&str>) -> String {
        contexts
            .iter()
            .map(|context| render_entry(context, 0))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The focused entry, its ancestors, and the direct children of each of
/// those, rendered as an indented tree.
///
/// Without a focus, or with a focus that is not registered, renders the same
/// text as [`FlatStrategy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeStrategy;

impl ContextStrategy for TreeStrategy {
    fn build_prompt(&self, contexts: &[ReadableContext], focus: Option<&str>) -> String {
        let by_id: HashMap<&str, &ReadableContext> =
            contexts.iter().map(|c| (c.id.as_str(), c)).collect();
        let Some(focus) = focus.filter(|id| by_id.contains_key(id)) else {
            debug!(focus = ?focus, "tree context strategy falling back to flat rendering");
            return FlatStrategy.build_prompt(contexts, None);
        };

        // Walk up from the focus. Dangling parents end the walk; so do cycles.
        let mut path = HashSet::<&str>::new();
        let mut cursor = Some(focus);
        while let Some(id) = cursor {
            let Some(context) = by_id.get(id) else {
                break;
            };
            if !path.insert(id) {
                break;
            }
            cursor = context.parent_id.as_deref();
        }

        let included: HashSet<&str> = contexts
            .iter()
            .filter(|c| {
                path.contains(c.id.as_str())
                    || c.parent_id.as_deref().is_some_and(|p| path.contains(p))
            })
            .map(|c| c.id.as_str())
            .collect();

        let mut children = HashMap::<&str, Vec<&ReadableContext>>::new();
        for context in contexts {
            if let Some(parent) = context.parent_id.as_deref() {
                if included.contains(context.id.as_str()) && included.contains(parent) {
                    children.entry(parent).or_default().push(context);
                }
            }
        }

        let mut lines = Vec::new();
        let mut rendered = HashSet::<&str>::new();
        let is_root = |c: &ReadableContext| {
            c.parent_id
                .as_deref()
                .map_or(true, |p| !included.contains(p))
        };
        for context in contexts.iter().filter(|c| included.contains(c.id.as_str())) {
            if is_root(context) {
                render_subtree(context, &children, &mut rendered, &mut lines);
            }
        }
        // Entries caught in a parent cycle have no root; render them flat.
        for context in contexts.iter().filter(|c| included.contains(c.id.as_str())) {
            render_subtree(context, &children, &mut rendered, &mut lines);
        }
        lines.join("\n")
    }
}

/// Preorder walk with an explicit stack; parent chains can be arbitrarily
/// long.
fn render_subtree<'a>(
    root: &'a ReadableContext,
    children: &HashMap<&str, Vec<&'a ReadableContext>>,
    rendered: &mut HashSet<&'a str>,
    lines: &mut Vec<String>,
) {
    let mut stack = vec![(root, 0usize)];
    while let Some((context, depth)) = stack.pop() {
        if !rendered.insert(context.id.as_str()) {
            continue;
        }
        lines.push(render_entry(context, depth));
        if let Some(kids) = children.get(context.id.as_str()) {
            stack.extend(kids.iter().rev().map(|child| (*child, depth + 1)));
        }
    }
}

fn render_entry(context: &ReadableContext, depth: usize) -> String {
    let indent = "  ".repeat(depth.min(MAX_INDENT_DEPTH));
    let value = match &context.value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    match &context.description {
        Some(description) => format!("{indent}- {description} [{}]: {value}", context.id),
        None => format!("{indent}- {}: {value}", context.id),
    }
}

/// Built-in strategies, selectable from configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Flat,
    Tree,
}

impl StrategyKind {
    pub fn build(self) -> Arc<dyn ContextStrategy> {
        match self {
            Self::Flat => Arc::new(FlatStrategy),
            Self::Tree => Arc::new(TreeStrategy),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Tree => "tree",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "tree" => Ok(Self::Tree),
            other => Err(ConfigError::Invalid(format!(
                "unknown context strategy `{other}`: expected `flat` or `tree`"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn abc() -> Vec<ReadableContext> {
        vec![
            ReadableContext::new("A", json!("alpha")),
            ReadableContext::new("B", json!("beta")).with_parent("A"),
            ReadableContext::new("C", json!("gamma")),
        ]
    }

    #[test]
    fn flat_renders_everything_in_order_and_ignores_focus() {
        let contexts = abc();
        let prompt = FlatStrategy.build_prompt(&contexts, Some("B"));
        assert_eq!(prompt, "- A: alpha\n- B: beta\n- C: gamma");
    }

    #[test]
    fn flat_renders_descriptions_and_json_values() {
        let contexts = vec![
            ReadableContext::new("user", json!({"name": "ann"})).with_description("Signed-in user"),
            ReadableContext::new("count", json!(3)),
        ];
        assert_eq!(
            FlatStrategy.build_prompt(&contexts, None),
            "- Signed-in user [user]: {\"name\":\"ann\"}\n- count: 3"
        );
    }

    #[test]
    fn flat_of_nothing_is_empty() {
        assert_eq!(FlatStrategy.build_prompt(&[], None), "");
    }

    #[test]
    fn tree_renders_focus_path_but_not_unrelated_roots() {
        let contexts = abc();
        let prompt = TreeStrategy.build_prompt(&contexts, Some("B"));
        assert_eq!(prompt, "- A: alpha\n  - B: beta");
        assert!(!prompt.contains("gamma"));
    }

    #[test]
    fn tree_includes_children_of_every_path_node() {
        let contexts = vec![
            ReadableContext::new("root", json!("r")),
            ReadableContext::new("doc", json!("d")).with_parent("root"),
            ReadableContext::new("sidebar", json!("s")).with_parent("root"),
            ReadableContext::new("para", json!("p")).with_parent("doc"),
            ReadableContext::new("word", json!("w")).with_parent("para"),
            ReadableContext::new("nav", json!("n")).with_parent("sidebar"),
        ];
        let prompt = TreeStrategy.build_prompt(&contexts, Some("doc"));
        assert_eq!(prompt, "- root: r\n  - doc: d\n    - para: p\n  - sidebar: s");
    }

    #[test]
    fn tree_falls_back_to_flat_without_a_known_focus() {
        let contexts = abc();
        let flat = FlatStrategy.build_prompt(&contexts, None);
        assert_eq!(TreeStrategy.build_prompt(&contexts, None), flat);
        assert_eq!(TreeStrategy.build_prompt(&contexts, Some("missing")), flat);
    }

    #[test]
    fn tree_tolerates_dangling_parents_and_cycles() {
        let dangling = vec![
            ReadableContext::new("orphan", json!(1)).with_parent("gone"),
            ReadableContext::new("other", json!(2)),
        ];
        assert_eq!(TreeStrategy.build_prompt(&dangling, Some("orphan")), "- orphan: 1");

        let cycle = vec![
            ReadableContext::new("x", json!(1)).with_parent("y"),
            ReadableContext::new("y", json!(2)).with_parent("x"),
        ];
        let prompt = TreeStrategy.build_prompt(&cycle, Some("x"));
        assert!(prompt.contains("- x: 1"));
        assert!(prompt.contains("y: 2"));
    }

    #[test]
    fn tree_renders_long_parent_chains_on_a_small_stack() {
        const LEN: usize = 200_000;
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let contexts: Vec<ReadableContext> = (0..LEN)
                    .map(|i| {
                        let context = ReadableContext::new(format!("n{i}"), json!(i));
                        match i {
                            0 => context,
                            _ => context.with_parent(format!("n{}", i - 1)),
                        }
                    })
                    .collect();
                let focus = format!("n{}", LEN - 1);
                TreeStrategy.build_prompt(&contexts, Some(focus.as_str()))
            })
            .unwrap();
        let prompt = handle.join().unwrap();
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(lines.len(), LEN);
        assert_eq!(lines[0], "- n0: 0");
        assert_eq!(lines[2], "    - n2: 2");
        let deepest = format!("{}- n{}: {}", "  ".repeat(MAX_INDENT_DEPTH), LEN - 1, LEN - 1);
        assert_eq!(lines[LEN - 1], deepest);
    }

    #[test]
    fn strategy_kind_parses_and_builds() {
        assert_eq!("Tree".parse::<StrategyKind>().unwrap(), StrategyKind::Tree);
        assert_eq!(" flat ".parse::<StrategyKind>().unwrap(), StrategyKind::Flat);
        assert!("graph".parse::<StrategyKind>().is_err());

        let contexts = abc();
        let tree = StrategyKind::Tree.build();
        assert_eq!(tree.build_prompt(&contexts, Some("B")), "- A: alpha\n  - B: beta");
        assert_eq!(StrategyKind::default().as_str(), "flat");
    }
}
