//! The client facade: one conversation's tool calls, readable contexts,
//! actions, and subscribers behind a single cloneable handle.
//!
//! Every mutation runs under one mutex. Subscribers are notified after the
//! lock is released with a snapshot taken while it was held, so a listener
//! always sees a consistent view and may call back into the client.
//!
//! Snapshots are queued in mutation order and delivered by one thread at a
//! time. The thread that finds the queue idle drains it, including entries
//! queued meanwhile by other threads or by listeners calling back in, so
//! subscribers never see an older snapshot after a newer one.

use crate::actions::{ActionDefinition, ActionRegistry, FunctionDeclaration};
use crate::config::ClientConfig;
use crate::context::{ContextRegistry, ContextStrategy, ReadableContext, StrategyKind};
use crate::error::{ActionError, EventError};
use crate::events::ProtocolEvent;
use crate::tool_calls::{
    DropStats, IngestOutcome, ToolCallSnapshot, ToolCallState, ToolCallTracker,
};
use crate::types::ToolDefinition;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Subscriber callback. Receives a point-in-time snapshot of every call.
pub type Listener = dyn Fn(&ToolCallSnapshot) + Send + Sync;

struct ClientState {
    tool_calls: ToolCallTracker,
    contexts: ContextRegistry,
    actions: ActionRegistry,
    strategy: Arc<dyn ContextStrategy>,
    strategy_name: &'static str,
    focus: Option<String>,
    action_timeout: Option<Duration>,
    listeners: BTreeMap<u64, Arc<Listener>>,
    next_listener: u64,
    pending: VecDeque<Notification>,
    delivering: bool,
}

impl ClientState {
    /// Queue the current snapshot for every listener. See [`Self::enqueue`].
    fn fan_out(&mut self) -> bool {
        let notification = Notification {
            snapshot: self.tool_calls.snapshot(),
            listeners: self.listeners.values().cloned().collect(),
        };
        self.enqueue(notification)
    }

    /// True when the caller must drain the queue.
    fn enqueue(&mut self, notification: Notification) -> bool {
        self.pending.push_back(notification);
        if self.delivering {
            false
        } else {
            self.delivering = true;
            true
        }
    }
}

/// Work to do once the state lock has been released.
struct Notification {
    snapshot: ToolCallSnapshot,
    listeners: Vec<Arc<Listener>>,
}

impl Notification {
    fn deliver(self) {
        for listener in &self.listeners {
            deliver_one(listener, &self.snapshot);
        }
    }
}

fn deliver_one(listener: &Arc<Listener>, snapshot: &ToolCallSnapshot) {
    if catch_unwind(AssertUnwindSafe(|| listener(snapshot))).is_err() {
        warn!("tool-call subscriber panicked; remaining subscribers still notified");
    }
}

fn lock(state: &Mutex<ClientState>) -> MutexGuard<'_, ClientState> {
    // A panicking strategy or renderer must not wedge the client.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Deliver queued notifications in order until the queue is empty.
fn drain(state: &Mutex<ClientState>) {
    loop {
        let next = {
            let mut state = lock(state);
            match state.pending.pop_front() {
                Some(notification) => notification,
                None => {
                    state.delivering = false;
                    return;
                }
            }
        };
        next.deliver();
    }
}

/// Streaming tool-call client.
///
/// Cheap to clone; clones share state. Separate [`Client::new`] calls are
/// fully independent.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Mutex<ClientState>>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner);
        f.debug_struct("Client")
            .field("tool_calls", &state.tool_calls.len())
            .field("contexts", &state.contexts.len())
            .field("actions", &state.actions.len())
            .field("strategy", &state.strategy_name)
            .field("focus", &state.focus)
            .field("subscribers", &state.listeners.len())
            .finish()
    }
}

impl Client {
    /// Client with the built-in defaults: flat strategy, no timeouts.
    pub fn new() -> Self {
        Self::from_config(&ClientConfig::default())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let state = ClientState {
            tool_calls: ToolCallTracker::with_idle_timeout(config.tool_calls.idle_timeout()),
            contexts: ContextRegistry::new(),
            actions: ActionRegistry::new(),
            strategy: config.context.strategy.build(),
            strategy_name: config.context.strategy.as_str(),
            focus: config.context.focus.clone(),
            action_timeout: config.actions.timeout(),
            listeners: BTreeMap::new(),
            next_listener: 0,
            pending: VecDeque::new(),
            delivering: false,
        };
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        lock(&self.inner)
    }

    fn drain(&self) {
        drain(&self.inner);
    }

    // -----------------------------------------------------------------------
    // Tool calls
    // -----------------------------------------------------------------------

    /// Advance tool-call state with one decoded event.
    ///
    /// Subscribers are notified when the event changed state, before this
    /// returns unless another thread is already delivering (that thread then
    /// delivers it) or this is a listener calling back in (delivered right
    /// after the listener returns). Dropped events
    /// are counted (see [`drop_stats`](Self::drop_stats)) and returned as
    /// [`IngestOutcome::Dropped`]; they never fail.
    pub fn ingest(&self, event: ProtocolEvent) -> IngestOutcome {
        let (outcome, must_drain) = {
            let mut state = self.lock();
            let outcome = state.tool_calls.ingest(event);
            let must_drain = outcome.mutated() && state.fan_out();
            (outcome, must_drain)
        };
        if must_drain {
            self.drain();
        }
        outcome
    }

    /// Decode and ingest one event. Undecodable payloads are counted as
    /// malformed and dropped.
    pub fn ingest_value(&self, value: Value) -> IngestOutcome {
        match ProtocolEvent::from_value(value) {
            Ok(event) => self.ingest(event),
            Err(error) => self.record_malformed(error),
        }
    }

    /// Decode and ingest one event from raw JSON text.
    pub fn ingest_json(&self, raw: &str) -> IngestOutcome {
        match ProtocolEvent::from_json(raw) {
            Ok(event) => self.ingest(event),
            Err(error) => self.record_malformed(error),
        }
    }

    fn record_malformed(&self, error: EventError) -> IngestOutcome {
        self.lock().tool_calls.record_malformed(error)
    }

    /// Register a listener. It is called once right away with the current
    /// snapshot and again after every state change until unsubscribed.
    /// Delivery follows the same rules as [`ingest`](Self::ingest).
    ///
    /// Dropping the returned handle does not unsubscribe.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ToolCallSnapshot) + Send + Sync + 'static,
    {
        let listener: Arc<Listener> = Arc::new(listener);
        let (id, must_drain) = {
            let mut state = self.lock();
            let id = state.next_listener;
            state.next_listener = state.next_listener.saturating_add(1);
            state.listeners.insert(id, Arc::clone(&listener));
            let initial = Notification {
                snapshot: state.tool_calls.snapshot(),
                listeners: vec![listener],
            };
            (id, state.enqueue(initial))
        };
        debug!(subscriber = id, "tool-call subscriber added");
        if must_drain {
            self.drain();
        }
        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn snapshot(&self) -> ToolCallSnapshot {
        self.lock().tool_calls.snapshot()
    }

    pub fn tool_call(&self, id: &str) -> Option<ToolCallState> {
        self.lock().tool_calls.get(id).cloned()
    }

    pub fn drop_stats(&self) -> DropStats {
        self.lock().tool_calls.drop_stats()
    }

    /// Fail running calls idle past the configured timeout. Returns the ids
    /// that moved to `error`.
    pub fn expire_idle_tool_calls(&self) -> Vec<String> {
        self.expire_idle_tool_calls_at(Instant::now())
    }

    /// [`expire_idle_tool_calls`](Self::expire_idle_tool_calls) against an
    /// explicit clock reading.
    pub fn expire_idle_tool_calls_at(&self, now: Instant) -> Vec<String> {
        let (expired, must_drain) = {
            let mut state = self.lock();
            let expired = state.tool_calls.expire_idle(now);
            let must_drain = !expired.is_empty() && state.fan_out();
            (expired, must_drain)
        };
        if must_drain {
            self.drain();
        }
        expired
    }

    /// Forget every tool call, e.g. when the conversation is cleared.
    /// Drop counters are kept.
    pub fn clear_tool_calls(&self) {
        let must_drain = {
            let mut state = self.lock();
            if state.tool_calls.is_empty() {
                false
            } else {
                state.tool_calls.clear();
                state.fan_out()
            }
        };
        if must_drain {
            self.drain();
        }
    }

    // -----------------------------------------------------------------------
    // Readable contexts
    // -----------------------------------------------------------------------

    /// Expose a piece of application state to the agent. Re-registering an
    /// id replaces the earlier entry.
    pub fn register_readable(&self, context: ReadableContext) -> ReadableRegistration {
        let id = context.id.clone();
        let token = self.lock().contexts.register(context);
        debug!(context = %id, "readable context registered");
        ReadableRegistration {
            inner: Arc::downgrade(&self.inner),
            id,
            token,
        }
    }

    /// Replace a registered context's value. False when `id` is unknown.
    pub fn update_readable(&self, id: &str, value: Value) -> bool {
        self.lock().contexts.update(id, value)
    }

    /// Registered contexts in registration order.
    pub fn readable_contexts(&self) -> Vec<ReadableContext> {
        self.lock().contexts.contexts()
    }

    /// Swap the prompt strategy. Registered contexts are untouched.
    pub fn set_context_strategy(&self, strategy: impl ContextStrategy + 'static) {
        let mut state = self.lock();
        state.strategy = Arc::new(strategy);
        state.strategy_name = "custom";
    }

    /// Switch to one of the built-in strategies.
    pub fn use_strategy_kind(&self, kind: StrategyKind) {
        let mut state = self.lock();
        state.strategy = kind.build();
        state.strategy_name = kind.as_str();
        debug!(strategy = kind.as_str(), "context strategy switched");
    }

    /// Set or clear the context id the strategy focuses on.
    pub fn set_context_focus(&self, focus: Option<&str>) {
        self.lock().focus = focus.map(str::to_string);
    }

    pub fn context_focus(&self) -> Option<String> {
        self.lock().focus.clone()
    }

    /// Render the registered contexts with the current strategy and focus.
    pub fn build_context_prompt(&self) -> String {
        let (strategy, contexts, focus) = {
            let state = self.lock();
            (
                Arc::clone(&state.strategy),
                state.contexts.contexts(),
                state.focus.clone(),
            )
        };
        strategy.build_prompt(&contexts, focus.as_deref())
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Make an action available to the agent. Re-registering a name
    /// replaces the earlier action.
    pub fn register_action(&self, action: ActionDefinition) -> ActionRegistration {
        let name = action.name().to_string();
        let token = self.lock().actions.register(action);
        debug!(action = %name, "action registered");
        ActionRegistration {
            inner: Arc::downgrade(&self.inner),
            name,
            token,
        }
    }

    /// Run an action's handler with `args`.
    ///
    /// The handler's own error comes back unchanged as
    /// [`ActionError::Handler`]. With an action timeout configured, a
    /// handler that runs past it yields [`ActionError::TimedOut`].
    pub async fn execute_action(&self, name: &str, args: Value) -> Result<Value, ActionError> {
        let timeout = self.lock().action_timeout;
        match timeout {
            Some(limit) => self.execute_action_with_timeout(name, args, limit).await,
            None => self.run_action(name, args).await,
        }
    }

    /// Run an action's handler, giving up after `limit`.
    pub async fn execute_action_with_timeout(
        &self,
        name: &str,
        args: Value,
        limit: Duration,
    ) -> Result<Value, ActionError> {
        match tokio::time::timeout(limit, self.run_action(name, args)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(action = %name, timeout_secs = limit.as_secs(), "action timed out");
                Err(ActionError::TimedOut {
                    name: name.to_string(),
                    after_secs: limit.as_secs(),
                })
            }
        }
    }

    async fn run_action(&self, name: &str, args: Value) -> Result<Value, ActionError> {
        // The handler is awaited without the state lock held.
        let handler = self
            .lock()
            .actions
            .handler(name)
            .ok_or_else(|| ActionError::NotFound(name.to_string()))?;
        debug!(action = %name, "executing action");
        handler.call(args).await.map_err(ActionError::Handler)
    }

    /// Declarations for every registered action, in registration order.
    pub fn build_function_declarations(&self) -> Vec<FunctionDeclaration> {
        self.lock().actions.function_declarations()
    }

    /// OpenAI-compatible tool definitions for every registered action.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.lock().actions.tool_definitions()
    }

    /// Text summary of a tool call from its action's renderer.
    ///
    /// `None` when the call is unknown, no action of that name is
    /// registered, or the action has no renderer.
    pub fn render_tool_call(&self, id: &str) -> Option<String> {
        let (call, action) = {
            let state = self.lock();
            let call = state.tool_calls.get(id)?.clone();
            let action = state.actions.get(&call.name)?.clone();
            (call, action)
        };
        action.render(&call)
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Handle for removing a subscriber.
#[derive(Debug)]
pub struct Subscription {
    inner: Weak<Mutex<ClientState>>,
    id: u64,
}

impl Subscription {
    /// Stop notifications. False if already removed or the client is gone.
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let removed = lock(&inner).listeners.remove(&self.id).is_some();
        if removed {
            debug!(subscriber = self.id, "tool-call subscriber removed");
        }
        removed
    }
}

/// Handle for removing a readable context.
#[derive(Debug)]
pub struct ReadableRegistration {
    inner: Weak<Mutex<ClientState>>,
    id: String,
    token: u64,
}

impl ReadableRegistration {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remove the entry, unless it has since been replaced by a newer
    /// registration of the same id.
    pub fn unregister(self) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let removed = lock(&inner).contexts.unregister(&self.id, self.token);
        if removed {
            debug!(context = %self.id, "readable context unregistered");
        }
        removed
    }
}

/// Handle for removing an action.
#[derive(Debug)]
pub struct ActionRegistration {
    inner: Weak<Mutex<ClientState>>,
    name: String,
    token: u64,
}

impl ActionRegistration {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remove the action, unless it has since been replaced by a newer
    /// registration of the same name.
    pub fn unregister(self) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let removed = lock(&inner).actions.unregister(&self.name, self.token);
        if removed {
            debug!(action = %self.name, "action unregistered");
        }
        removed
    }
}
