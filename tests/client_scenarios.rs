//! End-to-end behavior of the public client API.

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use toolstream::actions::{ActionDefinition, ActionParameter};
use toolstream::client::Client;
use toolstream::context::{ReadableContext, StrategyKind};
use toolstream::error::HandlerError;
use toolstream::events::ProtocolEvent;
use toolstream::tool_calls::{ToolCallSnapshot, ToolCallStatus};

fn search_events() -> Vec<Value> {
    vec![
        json!({"type": "tool_start", "id": "1", "name": "search"}),
        json!({"type": "tool_delta", "id": "1", "delta": "{\"q\":\"ab"}),
        json!({"type": "tool_delta", "id": "1", "delta": "c\"}"}),
        json!({"type": "tool_complete", "id": "1", "result": "ok"}),
    ]
}

fn collecting_listener() -> (
    Arc<Mutex<Vec<ToolCallSnapshot>>>,
    impl Fn(&ToolCallSnapshot) + Send + Sync + 'static,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |snapshot: &ToolCallSnapshot| {
        sink.lock().unwrap().push(snapshot.clone())
    })
}

#[test]
fn search_scenario_from_wire_json() {
    let client = Client::new();
    for event in search_events() {
        client.ingest_value(event);
    }
    let state = serde_json::to_value(client.tool_call("1").unwrap()).unwrap();
    assert_eq!(
        state,
        json!({
            "id": "1",
            "name": "search",
            "status": "completed",
            "args_buffer": "{\"q\":\"abc\"}",
            "args": {"q": "abc"},
            "result": "ok"
        })
    );
}

#[test]
fn late_subscriber_sees_same_state_as_early_subscriber() {
    let events = search_events();
    for cut in 0..=events.len() {
        let client = Client::new();
        let (early, early_listener) = collecting_listener();
        client.subscribe(early_listener);
        for event in &events[..cut] {
            client.ingest_value(event.clone());
        }

        let (late, late_listener) = collecting_listener();
        client.subscribe(late_listener);
        let early_last = early.lock().unwrap().last().cloned().unwrap();
        let late_first = late.lock().unwrap().first().cloned().unwrap();
        assert_eq!(late_first, early_last, "after {cut} events");
    }
}

#[test]
fn unknown_ids_leave_state_untouched() {
    let client = Client::new();
    client.ingest(ProtocolEvent::tool_start("known", "search"));
    let before = client.snapshot();

    let (seen, listener) = collecting_listener();
    client.subscribe(listener);
    client.ingest(ProtocolEvent::tool_delta("ghost", "{\"a\":1}"));
    client.ingest(ProtocolEvent::tool_complete("ghost", json!(null)));

    assert_eq!(client.snapshot(), before);
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(client.drop_stats().unknown_id, 2);
}

#[test]
fn arguments_grow_monotonically_while_streaming() {
    let value = json!({
        "title": "notes",
        "tags": ["a", "b"],
        "meta": {"draft": false, "rev": 12},
        "body": "line one\nline \"two\""
    });
    let raw = serde_json::to_string(&value).unwrap();

    let client = Client::new();
    client.ingest(ProtocolEvent::tool_start("w", "write"));
    let mut complete_fields: Vec<(String, Value)> = Vec::new();
    let chars: Vec<char> = raw.chars().collect();
    for chunk in chars.chunks(3) {
        let fragment: String = chunk.iter().collect();
        client.ingest(ProtocolEvent::tool_delta("w", fragment));
        let args = client.tool_call("w").unwrap().args;
        for (key, expected) in &complete_fields {
            assert_eq!(args.get(key), Some(expected), "field {key} regressed");
        }
        if let Value::Object(map) = &args {
            for (key, current) in map {
                if value.get(key) == Some(current)
                    && !complete_fields.iter().any(|(k, _)| k == key)
                {
                    complete_fields.push((key.clone(), current.clone()));
                }
            }
        }
    }
    client.ingest(ProtocolEvent::tool_complete("w", json!(true)));
    let done = client.tool_call("w").unwrap();
    assert_eq!(done.status, ToolCallStatus::Completed);
    assert_eq!(done.args, value);
}

#[test]
fn function_declaration_schema_is_exact() {
    let client = Client::new();
    client.register_action(
        ActionDefinition::from_fn("lookup", "look things up", |_args: Value| async {
            Ok::<_, HandlerError>(Value::Null)
        })
        .with_parameter(ActionParameter::string("term", "search term").required())
        .with_parameter(ActionParameter::array("sources", "where to look")),
    );
    let declarations = serde_json::to_value(client.build_function_declarations()).unwrap();
    assert_eq!(
        declarations,
        json!([{
            "name": "lookup",
            "description": "look things up",
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "term": {"type": "STRING", "description": "search term"},
                    "sources": {
                        "type": "ARRAY",
                        "description": "where to look",
                        "items": {"type": "STRING"}
                    }
                },
                "required": ["term"]
            }
        }])
    );
}

#[test]
fn tree_strategy_prunes_unrelated_roots() {
    let client = Client::new();
    client.register_readable(ReadableContext::new("A", json!("alpha")));
    client.register_readable(ReadableContext::new("B", json!("beta")).with_parent("A"));
    client.register_readable(ReadableContext::new("C", json!("gamma")));
    client.use_strategy_kind(StrategyKind::Tree);
    client.set_context_focus(Some("B"));

    let prompt = client.build_context_prompt();
    assert!(prompt.contains("alpha"));
    assert!(prompt.contains("beta"));
    assert!(!prompt.contains("gamma"));
}

#[tokio::test]
async fn actions_execute_concurrently_with_ingest() {
    let client = Client::new();
    let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();
    let gate = Arc::new(tokio::sync::Mutex::new(Some(gate_rx)));
    client.register_action(ActionDefinition::from_fn("wait", "", move |_args: Value| {
        let gate = Arc::clone(&gate);
        async move {
            if let Some(rx) = gate.lock().await.take() {
                rx.await.map_err(|e| Box::new(e) as HandlerError)?;
            }
            Ok::<_, HandlerError>(json!("released"))
        }
    }));

    let runner = client.clone();
    let pending = tokio::spawn(async move { runner.execute_action("wait", json!({})).await });

    // The handler is parked; the client must still accept events.
    tokio::task::yield_now().await;
    client.ingest(ProtocolEvent::tool_start("1", "wait"));
    assert_eq!(client.snapshot().len(), 1);

    gate_tx.send(()).unwrap();
    assert_eq!(pending.await.unwrap().unwrap(), json!("released"));
}

#[tokio::test]
async fn missing_action_is_distinguishable_from_handler_failure() {
    let client = Client::new();
    client.register_action(ActionDefinition::from_fn("fail", "", |_args: Value| async {
        Err::<Value, HandlerError>("upstream 503".into())
    }));
    let missing = client.execute_action("nope", json!({})).await.unwrap_err();
    assert!(missing.is_not_found());
    let failed = client.execute_action("fail", json!({})).await.unwrap_err();
    assert!(!failed.is_not_found());
    assert_eq!(failed.into_handler_error().unwrap().to_string(), "upstream 503");
}
