//! Toolstream: a streaming client for AI-agent tool invocation.
//!
//! The client ingests protocol events describing an agent's tool calls,
//! rebuilds each call's arguments from arbitrarily fragmented JSON as the
//! fragments arrive, and publishes consistent snapshots to subscribers. It
//! also holds the application state the agent may read (readable contexts)
//! and the actions the agent may invoke.
//!
//! # Quick start
//!
//! ```
//! use serde_json::json;
//! use toolstream::client::Client;
//! use toolstream::events::ProtocolEvent;
//!
//! let client = Client::new();
//! let _subscription = client.subscribe(|snapshot| {
//!     for (id, call) in snapshot {
//!         println!("{id}: {} {:?} {}", call.name, call.status, call.args);
//!     }
//! });
//!
//! client.ingest(ProtocolEvent::tool_start("1", "search"));
//! client.ingest(ProtocolEvent::tool_delta("1", r#"{"q":"ab"#));
//! assert_eq!(client.tool_call("1").unwrap().args, json!({"q": "ab"}));
//! ```

pub mod actions;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod partial_json;
#[cfg(test)]
pub mod testsupport;
pub mod textutil;
pub mod tool_calls;
pub mod types;
