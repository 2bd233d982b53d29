// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from journal replay

mod catalog;
mod context;
mod events;
mod installs;
mod tools;
mod types;

pub use types::UserRecord;

use crate::change::StateChange;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use troupe_core::{
    AgentInstallation, AgentManifest, EventRecord, ExecutionTrace, HumanApproval, JsonMap,
    ToolDefinition, ToolExecution,
};

/// Materialized state built from journal replay.
///
/// All maps are keyed by the string form of the domain id. Per-user
/// installations use an [`IndexMap`] so dispatch iterates in insertion
/// order (stable per user, but not a public contract).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CoreState {
    pub users: HashMap<String, UserRecord>,
    /// Catalog: `"{agent_id}:{version}"` → manifest.
    pub manifests: HashMap<String, AgentManifest>,
    pub tool_definitions: HashMap<String, ToolDefinition>,
    /// user_id → installation_id → installation, in installation order.
    #[serde(default)]
    pub installations: HashMap<String, IndexMap<String, AgentInstallation>>,
    /// installation_id → private agent memory (exists iff the installation does).
    #[serde(default)]
    pub memories: HashMap<String, JsonMap>,
    /// user_id → append-ordered immutable event log.
    #[serde(default)]
    pub events: HashMap<String, Vec<EventRecord>>,
    #[serde(default)]
    pub traces: IndexMap<String, ExecutionTrace>,
    #[serde(default)]
    pub tool_executions: IndexMap<String, ToolExecution>,
    /// execution_id → at most one approval.
    #[serde(default)]
    pub approvals: HashMap<String, HumanApproval>,
}

impl CoreState {
    /// Apply a change to derive state.
    ///
    /// # Idempotency Requirement
    ///
    /// **All change handlers MUST be idempotent.** Applying the same change
    /// twice must produce the same state as applying it once: changes are
    /// re-applied when the journal is replayed after a snapshot boundary
    /// shifts or a process restart interrupts compaction.
    ///
    /// Guidelines:
    /// - Guard inserts with existence checks
    /// - Guard transitions with `can_transition_to` / terminal checks
    /// - Shallow merges are naturally idempotent (same patch, same result)
    pub fn apply(&mut self, change: &StateChange) {
        match change {
            StateChange::UserCreated { .. } | StateChange::SharedContextMerged { .. } => {
                context::apply(self, change)
            }

            StateChange::ManifestRegistered { .. } | StateChange::ToolDefined { .. } => {
                catalog::apply(self, change)
            }

            StateChange::InstallationCreated { .. } | StateChange::AgentMemoryMerged { .. } => {
                installs::apply(self, change)
            }

            StateChange::EventAppended { .. }
            | StateChange::TraceRecorded { .. }
            | StateChange::TraceFinalized { .. } => events::apply(self, change),

            StateChange::ToolExecutionCreated { .. }
            | StateChange::ToolExecutionTransitioned { .. }
            | StateChange::ApprovalRecorded { .. } => tools::apply(self, change),
        }
    }
}

#[cfg(test)]
#[path = "../state_tests.rs"]
mod tests;
