// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution traces: one audit row per (event, dispatched installation).

use crate::event::EventId;
use crate::installation::InstallationId;
use crate::manifest::AgentId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an execution trace.
    pub struct TraceId("trc-");
}

/// Status of one handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

crate::simple_display! {
    TraceStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

impl TraceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TraceStatus::Completed | TraceStatus::Failed)
    }
}

/// Record of one agent's handling of one event.
///
/// Annotations carry non-fatal warnings surfaced during effect
/// application (e.g. a shared-context update dropped for lack of
/// permission). The trace itself still completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub id: TraceId,
    pub event_id: EventId,
    pub agent_id: AgentId,
    pub installation_id: InstallationId,
    pub status: TraceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
}

impl ExecutionTrace {
    /// A trace starts in `running`, at the moment the handler is invoked.
    pub fn started(
        event_id: EventId,
        agent_id: AgentId,
        installation_id: InstallationId,
        now_ms: u64,
    ) -> Self {
        Self {
            id: TraceId::new(),
            event_id,
            agent_id,
            installation_id,
            status: TraceStatus::Running,
            error: None,
            annotations: Vec::new(),
            started_at_ms: now_ms,
            finished_at_ms: None,
        }
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
