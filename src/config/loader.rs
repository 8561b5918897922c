//! Top-level config loading pipeline.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::env::apply_env_overrides;
use super::sources::{config_root_dir, read_config_text_with_sources};
use super::types::FileConfig;
use super::{ActionsConfig, ClientConfig, ContextConfig, LoadedConfig, ToolCallsConfig};

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from `--config`).
pub fn load_config(path_override: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    Ok(load_config_with_source(path_override)?.config)
}

/// Load configuration and report which file it came from.
pub fn load_config_with_source(path_override: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

pub(super) fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&Path>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<LoadedConfig, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (config_text, source) =
        read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let mut config = parse_config(&config_text)?;
    apply_env_overrides(&mut config, &env_lookup)?;
    Ok(LoadedConfig { config, source })
}

/// Parse and validate config file text. Empty text yields defaults.
pub fn parse_config(text: &str) -> Result<ClientConfig, ConfigError> {
    let parsed: FileConfig = toml::from_str(text)?;
    resolve_file_config(parsed)
}

fn resolve_file_config(file: FileConfig) -> Result<ClientConfig, ConfigError> {
    let strategy = match file.context.strategy.as_deref() {
        Some(raw) => raw.parse()?,
        None => Default::default(),
    };
    let focus = file
        .context
        .focus
        .map(|focus| focus.trim().to_string())
        .filter(|focus| !focus.is_empty());
    Ok(ClientConfig {
        context: ContextConfig { strategy, focus },
        tool_calls: ToolCallsConfig {
            idle_timeout_secs: file.tool_calls.idle_timeout_secs.map(|secs| secs.max(1)),
        },
        actions: ActionsConfig {
            timeout_secs: file.actions.timeout_secs.map(|secs| secs.max(1)),
        },
    })
}
