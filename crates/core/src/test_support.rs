// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use crate::json::JsonMap;
use crate::manifest::{AgentManifest, Permissions};
use crate::sdk::{
    Agent, AgentContext, AgentFailure, AgentResult, EmittedEvent, EventView, Tool, ToolFailure,
    ToolRequest,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for schemaless JSON mappings.
pub mod strategies {
    use crate::json::JsonMap;
    use proptest::prelude::*;
    use serde_json::Value;

    pub fn json_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| Value::from(n)),
            "[a-z]{0,8}".prop_map(Value::String),
            prop::collection::vec(any::<i32>().prop_map(Value::from), 0..3)
                .prop_map(Value::Array),
        ]
    }

    pub fn json_map() -> impl Strategy<Value = JsonMap> {
        prop::collection::btree_map("[a-z]{1,6}", json_value(), 0..6)
            .prop_map(|m| m.into_iter().collect())
    }
}

// ── Mapping helpers ─────────────────────────────────────────────────────

/// Convert a `serde_json::json!` object literal into a [`JsonMap`].
pub fn payload(value: serde_json::Value) -> JsonMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("payload must be a JSON object, got {other}"),
    }
}

/// Build a subscription set from event-type names.
pub fn subscriptions(event_types: &[&str]) -> BTreeSet<String> {
    event_types.iter().map(|s| s.to_string()).collect()
}

// ── Scripted agent ──────────────────────────────────────────────────────

/// Record of one handler invocation, captured for assertions.
#[derive(Debug, Clone)]
pub struct SeenEvent {
    pub event: EventView,
    pub context: AgentContext,
}

/// A pure agent with canned behavior, for orchestrator and spec tests.
///
/// Configure the manifest, the memory returned from onboarding, and the
/// result returned from every `handle_event` call. Invocations are
/// recorded and can be inspected through [`ScriptedAgent::seen`].
pub struct ScriptedAgent {
    manifest: AgentManifest,
    onboard_memory: JsonMap,
    onboard_error: Option<String>,
    result: AgentResult,
    handle_error: Option<String>,
    panic_message: Option<String>,
    delay: Option<Duration>,
    seen: Arc<Mutex<Vec<SeenEvent>>>,
}

impl ScriptedAgent {
    pub fn new(manifest: AgentManifest) -> Self {
        Self {
            manifest,
            onboard_memory: JsonMap::new(),
            onboard_error: None,
            result: AgentResult::default(),
            handle_error: None,
            panic_message: None,
            delay: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Memory returned from `onboard`.
    pub fn onboard_memory(mut self, memory: JsonMap) -> Self {
        self.onboard_memory = memory;
        self
    }

    /// Make `onboard` fail with the given message.
    pub fn fail_onboard(mut self, msg: impl Into<String>) -> Self {
        self.onboard_error = Some(msg.into());
        self
    }

    /// Result returned from every `handle_event`.
    pub fn result(mut self, result: AgentResult) -> Self {
        self.result = result;
        self
    }

    /// Shorthand: handle_event emits a single event.
    pub fn emits(mut self, event_type: &str, event_payload: JsonMap) -> Self {
        self.result.events.push(EmittedEvent {
            event_type: event_type.to_string(),
            payload: event_payload,
        });
        self
    }

    /// Shorthand: handle_event requests a single tool call.
    pub fn requests_tool(mut self, tool_id: &str, tool_payload: JsonMap) -> Self {
        self.result
            .tool_requests
            .push(ToolRequest { tool_id: tool_id.to_string(), payload: tool_payload });
        self
    }

    /// Shorthand: handle_event writes shared context updates.
    pub fn writes_shared(mut self, updates: JsonMap) -> Self {
        self.result.shared_context_updates = updates;
        self
    }

    /// Shorthand: handle_event writes agent memory updates.
    pub fn writes_memory(mut self, updates: JsonMap) -> Self {
        self.result.agent_memory_updates = updates;
        self
    }

    /// Make `handle_event` fail with the given message.
    pub fn fail_handling(mut self, msg: impl Into<String>) -> Self {
        self.handle_error = Some(msg.into());
        self
    }

    /// Make `handle_event` panic with the given message.
    pub fn panics(mut self, msg: impl Into<String>) -> Self {
        self.panic_message = Some(msg.into());
        self
    }

    /// Make `handle_event` block for the given duration before returning.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle to the recorded invocations.
    pub fn seen(&self) -> Arc<Mutex<Vec<SeenEvent>>> {
        Arc::clone(&self.seen)
    }
}

impl Agent for ScriptedAgent {
    fn manifest(&self) -> AgentManifest {
        self.manifest.clone()
    }

    fn onboard(&self, _inputs: &JsonMap, _context: &AgentContext) -> Result<JsonMap, AgentFailure> {
        match &self.onboard_error {
            Some(msg) => Err(AgentFailure::new(msg.clone())),
            None => Ok(self.onboard_memory.clone()),
        }
    }

    fn handle_event(
        &self,
        event: &EventView,
        context: &AgentContext,
    ) -> Result<AgentResult, AgentFailure> {
        self.seen.lock().push(SeenEvent { event: event.clone(), context: context.clone() });
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(msg) = &self.panic_message {
            panic!("{msg}");
        }
        match &self.handle_error {
            Some(msg) => Err(AgentFailure::new(msg.clone())),
            None => Ok(self.result.clone()),
        }
    }
}

/// Manifest preset: subscribed to `subscribed`, full shared-context access.
pub fn manifest_for(agent_id: &str, subscribed: &[&str]) -> AgentManifest {
    AgentManifest::builder()
        .agent_id(agent_id)
        .name(agent_id)
        .subscribed_events(subscriptions(subscribed))
        .permissions(Permissions { read_shared_context: true, write_shared_context: true })
        .build()
}

// ── Recording tool ──────────────────────────────────────────────────────

/// A tool implementation that records calls and returns a canned result.
pub struct RecordingTool {
    result: Result<JsonMap, String>,
    calls: Arc<Mutex<Vec<JsonMap>>>,
}

impl RecordingTool {
    pub fn ok(result: JsonMap) -> Self {
        Self { result: Ok(result), calls: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn failing(msg: impl Into<String>) -> Self {
        Self { result: Err(msg.into()), calls: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Handle to the recorded payloads.
    pub fn calls(&self) -> Arc<Mutex<Vec<JsonMap>>> {
        Arc::clone(&self.calls)
    }
}

impl Tool for RecordingTool {
    fn execute(&self, tool_payload: &JsonMap) -> Result<JsonMap, ToolFailure> {
        self.calls.lock().push(tool_payload.clone());
        match &self.result {
            Ok(map) => Ok(map.clone()),
            Err(msg) => Err(ToolFailure::new(msg.clone())),
        }
    }
}
