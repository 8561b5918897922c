//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`TOOLSTREAM_CONTEXT_STRATEGY`,
//!    `TOOLSTREAM_CONTEXT_FOCUS`, `TOOLSTREAM_IDLE_TIMEOUT_SECS`,
//!    `TOOLSTREAM_ACTION_TIMEOUT_SECS`)
//! 2. TOML file specified via --config CLI flag
//! 3. ./toolstream.toml in the current directory
//! 4. $XDG_CONFIG_HOME/toolstream/toolstream.toml (or
//!    ~/.config/toolstream/toolstream.toml)
//! 5. Built-in defaults
//!
//! ```toml
//! [context]
//! strategy = "tree"
//! focus = "editor"
//!
//! [tool_calls]
//! idle_timeout_secs = 300
//!
//! [actions]
//! timeout_secs = 30
//! ```

mod defaults;
mod env;
mod loader;
mod sources;
mod types;

pub use loader::{load_config, load_config_with_source, parse_config};
pub use sources::config_root_dir;
pub use types::{
    ActionsConfig, ClientConfig, ConfigSource, ContextConfig, LoadedConfig, ToolCallsConfig,
};
