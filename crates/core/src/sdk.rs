// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-process agent and tool SDK.
//!
//! Agents are pure event handlers: no I/O, no store access, no tool
//! invocation. They receive a scoped [`AgentContext`], return an
//! [`AgentResult`] describing the effects they want, and the orchestrator
//! applies those effects. Determinism is expected but not enforced.

use crate::json::JsonMap;
use crate::manifest::{AgentId, AgentManifest};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The event as agents see it.
///
/// Store-assigned fields (id, timestamp) are withheld so handler output
/// cannot depend on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventView {
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_agent: Option<AgentId>,
    #[serde(default)]
    pub payload: JsonMap,
}

impl From<&crate::event::EventRecord> for EventView {
    fn from(record: &crate::event::EventRecord) -> Self {
        Self {
            event_type: record.event_type.clone(),
            source_agent: record.source_agent.clone(),
            payload: record.payload.clone(),
        }
    }
}

/// Scoped state handed to an agent for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentContext {
    /// The user's profile attributes (read-only).
    #[serde(default)]
    pub user_profile: JsonMap,
    /// The user's collaborative shared context, as of dispatch start.
    #[serde(default)]
    pub shared_context: JsonMap,
    /// This installation's private memory.
    #[serde(default)]
    pub agent_memory: JsonMap,
    /// Newest-first event snapshot; during dispatch the current event is
    /// the first element.
    #[serde(default)]
    pub recent_events: Vec<EventView>,
}

/// An event an agent wants to emit.
///
/// The orchestrator stamps `source_agent` and assigns id/timestamp when
/// the cascade is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedEvent {
    pub event_type: String,
    #[serde(default)]
    pub payload: JsonMap,
}

/// A side-effectful tool call an agent requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub tool_id: String,
    #[serde(default)]
    pub payload: JsonMap,
}

/// Self-reported outcome of a handler invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Completed,
    Failed,
    PendingApproval,
}

crate::simple_display! {
    AgentStatus {
        Completed => "completed",
        Failed => "failed",
        PendingApproval => "pending_approval",
    }
}

/// Everything an agent wants done as a consequence of one event.
///
/// Effects are applied by the orchestrator in declaration order: shared
/// context, agent memory, tool requests, then emitted events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Shallow-merged into shared context (requires `write_shared_context`).
    #[serde(default)]
    pub shared_context_updates: JsonMap,
    /// Shallow-merged into this installation's memory.
    #[serde(default)]
    pub agent_memory_updates: JsonMap,
    /// Events to cascade, in emission order.
    #[serde(default)]
    pub events: Vec<EmittedEvent>,
    /// Tool calls to request, in order.
    #[serde(default)]
    pub tool_requests: Vec<ToolRequest>,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error raised by an agent implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct AgentFailure(pub String);

impl AgentFailure {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Error raised by a tool implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ToolFailure(pub String);

impl ToolFailure {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// An installable agent implementation.
///
/// Registered at startup under its manifest's `(agent_id, version)`.
pub trait Agent: Send + Sync {
    /// The static descriptor this implementation was registered under.
    fn manifest(&self) -> AgentManifest;

    /// Called once at installation. Returns the initial agent memory;
    /// an error aborts (and rolls back) the installation.
    fn onboard(&self, inputs: &JsonMap, context: &AgentContext) -> Result<JsonMap, AgentFailure>;

    /// Handle one event. Pure: effects go in the returned [`AgentResult`].
    fn handle_event(
        &self,
        event: &EventView,
        context: &AgentContext,
    ) -> Result<AgentResult, AgentFailure>;
}

/// A side-effectful tool implementation, registered under its `tool_id`.
pub trait Tool: Send + Sync {
    /// Execute the tool synchronously. Errors are captured on the
    /// execution row and never propagate to the requesting agent.
    fn execute(&self, payload: &JsonMap) -> Result<JsonMap, ToolFailure>;
}
