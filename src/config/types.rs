//! Configuration data model.
//!
//! `FileConfig` mirrors the TOML file as written; `ClientConfig` is the
//! validated form the client consumes.

use serde::Deserialize;
use std::time::Duration;

use crate::context::StrategyKind;

/// Validated client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub context: ContextConfig,
    pub tool_calls: ToolCallsConfig,
    pub actions: ActionsConfig,
}

/// Prompt rendering of readable contexts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextConfig {
    pub strategy: StrategyKind,
    /// Context id the tree strategy focuses on.
    pub focus: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolCallsConfig {
    /// Running calls quiet for longer than this are failed by
    /// `expire_idle_tool_calls`. `None` disables the check.
    pub idle_timeout_secs: Option<u64>,
}

impl ToolCallsConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionsConfig {
    /// Upper bound on a single handler run. `None` waits forever.
    pub timeout_secs: Option<u64>,
}

impl ActionsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` path.
    Explicit(std::path::PathBuf),
    /// `./toolstream.toml`.
    Local,
    /// `<config root>/toolstream/toolstream.toml`.
    Global(std::path::PathBuf),
    /// No file found.
    BuiltInDefaults,
}

/// Configuration plus the source it was read from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ClientConfig,
    pub source: ConfigSource,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(super) struct FileConfig {
    pub(super) context: FileContextConfig,
    pub(super) tool_calls: FileToolCallsConfig,
    pub(super) actions: FileActionsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(super) struct FileContextConfig {
    pub(super) strategy: Option<String>,
    pub(super) focus: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(super) struct FileToolCallsConfig {
    pub(super) idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(super) struct FileActionsConfig {
    pub(super) timeout_secs: Option<u64>,
}
