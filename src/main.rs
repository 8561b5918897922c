//! CLI entry point for toolstream.

mod cli;

use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::io::Read;
use toolstream::actions::{ActionDefinition, ActionSchema, FunctionDeclaration};
use toolstream::client::Client;
use toolstream::config::{load_config_with_source, ClientConfig};
use toolstream::context::{ReadableContext, StrategyKind};
use toolstream::error::{ConfigError, HandlerError};
use toolstream::events::AgentMessage;
use toolstream::partial_json::reconstruct;
use toolstream::tool_calls::{DropStats, IngestOutcome, ToolCallSnapshot};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = cli::Args::parse();
    init_tracing(args.verbose);

    let config = match load_config_with_source(args.config.as_deref()) {
        Ok(loaded) => {
            debug!(source = ?loaded.source, "configuration loaded");
            loaded.config
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args.command, &config) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Log to stderr so stdout stays machine-readable. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "toolstream=info",
        1 => "toolstream=debug",
        _ => "toolstream=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: cli::Command, config: &ClientConfig) -> Result<(), CliError> {
    match command {
        cli::Command::Replay { input } => {
            let report = replay(&read_input(&input)?, config);
            for message in &report.messages {
                if let Some(content) = message.content() {
                    info!(content = %content, "agent message");
                }
            }
            print_json(&report.snapshot)?;
            eprintln!("{}", format_drop_stats(&report.drops));
        }
        cli::Command::Reconstruct { input } => {
            print_json(&reconstruct(&read_input(&input)?))?;
        }
        cli::Command::Declarations { input, openai } => {
            let schemas = parse_schemas(&read_input(&input)?)?;
            if openai {
                let client = client_with_schemas(config, schemas);
                print_json(&client.tool_definitions())?;
            } else {
                let declarations: Vec<FunctionDeclaration> =
                    schemas.iter().map(FunctionDeclaration::from_schema).collect();
                print_json(&declarations)?;
            }
        }
        cli::Command::Context {
            input,
            strategy,
            focus,
        } => {
            let contexts: Vec<ReadableContext> = serde_json::from_str(&read_input(&input)?)?;
            let strategy = strategy.as_deref().map(str::parse::<StrategyKind>).transpose()?;
            println!(
                "{}",
                render_contexts(config, contexts, strategy, focus.as_deref())
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

struct ReplayReport {
    snapshot: ToolCallSnapshot,
    drops: DropStats,
    messages: Vec<AgentMessage>,
}

/// Ingest one event per non-blank line and report the final state.
fn replay(text: &str, config: &ClientConfig) -> ReplayReport {
    let client = Client::from_config(config);
    let mut messages = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match client.ingest_json(line) {
            IngestOutcome::Passthrough(message) => messages.push(message),
            IngestOutcome::Dropped(reason) => {
                debug!(line = index + 1, reason = ?reason, "event dropped during replay");
            }
            _ => {}
        }
    }
    client.expire_idle_tool_calls();
    ReplayReport {
        snapshot: client.snapshot(),
        drops: client.drop_stats(),
        messages,
    }
}

fn format_drop_stats(drops: &DropStats) -> String {
    format!(
        "dropped {} events (unknown id: {}, finished call: {}, duplicate start: {}, malformed: {})",
        drops.total(),
        drops.unknown_id,
        drops.terminal,
        drops.duplicate_start,
        drops.malformed
    )
}

fn parse_schemas(text: &str) -> Result<Vec<ActionSchema>, CliError> {
    Ok(serde_json::from_str(text)?)
}

/// Schemas alone carry no behavior; register them with a handler that only
/// echoes its arguments so the client can publish them.
fn client_with_schemas(config: &ClientConfig, schemas: Vec<ActionSchema>) -> Client {
    let client = Client::from_config(config);
    for schema in schemas {
        let mut action = ActionDefinition::from_fn(
            schema.name.clone(),
            schema.description.clone(),
            |args: Value| async move { Ok::<_, HandlerError>(args) },
        );
        action.schema = schema;
        client.register_action(action);
    }
    client
}

fn render_contexts(
    config: &ClientConfig,
    contexts: Vec<ReadableContext>,
    strategy: Option<StrategyKind>,
    focus: Option<&str>,
) -> String {
    let client = Client::from_config(config);
    for context in contexts {
        client.register_readable(context);
    }
    if let Some(kind) = strategy {
        client.use_strategy_kind(kind);
    }
    if focus.is_some() {
        client.set_context_focus(focus);
    }
    client.build_context_prompt()
}

// ---------------------------------------------------------------------------
// Plumbing
// ---------------------------------------------------------------------------

fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug)]
enum CliError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Config(ConfigError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Json(e) => write!(f, "json: {e}"),
            Self::Config(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
