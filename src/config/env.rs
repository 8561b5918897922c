//! Environment variable overrides.
//!
//! `TOOLSTREAM_*` variables win over whatever the config file says.

use crate::error::ConfigError;

use super::defaults::{
    ENV_ACTION_TIMEOUT_SECS, ENV_CONTEXT_FOCUS, ENV_CONTEXT_STRATEGY, ENV_IDLE_TIMEOUT_SECS,
};
use super::ClientConfig;

pub(super) fn apply_env_overrides<FEnv>(
    config: &mut ClientConfig,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(strategy) = non_empty(env_lookup, ENV_CONTEXT_STRATEGY) {
        config.context.strategy = strategy.parse()?;
    }
    if let Some(focus) = non_empty(env_lookup, ENV_CONTEXT_FOCUS) {
        config.context.focus = Some(focus);
    }
    if let Some(raw) = non_empty(env_lookup, ENV_IDLE_TIMEOUT_SECS) {
        config.tool_calls.idle_timeout_secs = Some(parse_secs(ENV_IDLE_TIMEOUT_SECS, &raw)?);
    }
    if let Some(raw) = non_empty(env_lookup, ENV_ACTION_TIMEOUT_SECS) {
        config.actions.timeout_secs = Some(parse_secs(ENV_ACTION_TIMEOUT_SECS, &raw)?);
    }
    Ok(())
}

fn non_empty<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse whole seconds, clamped to at least 1 so "0" never means "expire now".
fn parse_secs(name: &str, raw: &str) -> Result<u64, ConfigError> {
    let parsed = raw.trim().parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!(
            "invalid {name} value `{raw}`: expected positive integer seconds"
        ))
    })?;
    Ok(parsed.max(1))
}
