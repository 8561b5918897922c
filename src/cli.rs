//! CLI argument parsing via clap.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Replay and inspect streamed agent tool-call traffic.
#[derive(Debug, Parser)]
#[command(name = "toolstream", version)]
pub struct Args {
    /// Path to config file (default: ./toolstream.toml or
    /// ~/.config/toolstream/toolstream.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Feed JSON-lines protocol events through a client and print the final
    /// tool-call snapshot.
    Replay {
        /// Event file, or `-` for stdin.
        #[arg(value_name = "FILE", default_value = "-")]
        input: String,
    },
    /// Print the best-effort value of a possibly truncated JSON document.
    Reconstruct {
        /// Fragment file, or `-` for stdin.
        #[arg(value_name = "FILE", default_value = "-")]
        input: String,
    },
    /// Print function declarations for a JSON array of action schemas.
    Declarations {
        /// Action schema file, or `-` for stdin.
        #[arg(value_name = "FILE")]
        input: String,

        /// Emit OpenAI-compatible tool definitions instead.
        #[arg(long = "openai")]
        openai: bool,
    },
    /// Render a JSON array of readable contexts into prompt text.
    Context {
        /// Context file, or `-` for stdin.
        #[arg(value_name = "FILE", default_value = "-")]
        input: String,

        /// Override the configured strategy (`flat` or `tree`).
        #[arg(long = "strategy")]
        strategy: Option<String>,

        /// Override the configured focus context id.
        #[arg(long = "focus")]
        focus: Option<String>,
    },
}
