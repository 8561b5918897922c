//! Default configuration constants.

/// Config file name looked up in the working directory and config root.
pub(super) const CONFIG_FILE_NAME: &str = "toolstream.toml";
/// Directory under the config root (`$XDG_CONFIG_HOME` or `~/.config`).
pub(super) const CONFIG_DIR_NAME: &str = "toolstream";

pub(super) const ENV_CONTEXT_STRATEGY: &str = "TOOLSTREAM_CONTEXT_STRATEGY";
pub(super) const ENV_CONTEXT_FOCUS: &str = "TOOLSTREAM_CONTEXT_FOCUS";
pub(super) const ENV_IDLE_TIMEOUT_SECS: &str = "TOOLSTREAM_IDLE_TIMEOUT_SECS";
pub(super) const ENV_ACTION_TIMEOUT_SECS: &str = "TOOLSTREAM_ACTION_TIMEOUT_SECS";
