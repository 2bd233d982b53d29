// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State changes: the journal vocabulary.
//!
//! Every committed mutation is one of these records. State is derived by
//! replaying them; a commit batch is appended to the journal as a single
//! entry, so multi-record transactions are atomic.
//!
//! Serializes with `{"type": "area:fact", ...fields}` format.

use serde::{Deserialize, Serialize};
use troupe_core::{
    AgentInstallation, AgentManifest, EventRecord, ExecutionTrace, HumanApproval, JsonMap,
    ToolDefinition, ToolExecution, ToolExecutionStatus, TraceStatus,
};

/// Facts that mutate the materialized state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StateChange {
    // -- user --
    #[serde(rename = "user:created")]
    UserCreated {
        user_id: String,
        #[serde(default)]
        profile: JsonMap,
        created_at_ms: u64,
    },

    #[serde(rename = "user:shared_context_merged")]
    SharedContextMerged {
        user_id: String,
        patch: JsonMap,
    },

    // -- catalog --
    #[serde(rename = "catalog:manifest_registered")]
    ManifestRegistered { manifest: AgentManifest },

    #[serde(rename = "catalog:tool_defined")]
    ToolDefined { definition: ToolDefinition },

    // -- installation --
    #[serde(rename = "installation:created")]
    InstallationCreated {
        installation: AgentInstallation,
        /// Initial memory from onboarding; lives and dies with the installation.
        #[serde(default)]
        memory: JsonMap,
    },

    #[serde(rename = "installation:memory_merged")]
    AgentMemoryMerged {
        installation_id: String,
        patch: JsonMap,
    },

    // -- event log --
    #[serde(rename = "event:appended")]
    EventAppended { event: EventRecord },

    #[serde(rename = "trace:recorded")]
    TraceRecorded { trace: ExecutionTrace },

    #[serde(rename = "trace:finalized")]
    TraceFinalized {
        trace_id: String,
        status: TraceStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<String>,
        finished_at_ms: u64,
    },

    // -- tools --
    #[serde(rename = "tool:execution_created")]
    ToolExecutionCreated { execution: ToolExecution },

    #[serde(rename = "tool:execution_transitioned")]
    ToolExecutionTransitioned {
        execution_id: String,
        status: ToolExecutionStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<JsonMap>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        updated_at_ms: u64,
    },

    #[serde(rename = "tool:approval_recorded")]
    ApprovalRecorded { approval: HumanApproval },
}

impl StateChange {
    /// Change name for log lines (e.g., "event:appended").
    pub fn name(&self) -> &'static str {
        match self {
            StateChange::UserCreated { .. } => "user:created",
            StateChange::SharedContextMerged { .. } => "user:shared_context_merged",
            StateChange::ManifestRegistered { .. } => "catalog:manifest_registered",
            StateChange::ToolDefined { .. } => "catalog:tool_defined",
            StateChange::InstallationCreated { .. } => "installation:created",
            StateChange::AgentMemoryMerged { .. } => "installation:memory_merged",
            StateChange::EventAppended { .. } => "event:appended",
            StateChange::TraceRecorded { .. } => "trace:recorded",
            StateChange::TraceFinalized { .. } => "trace:finalized",
            StateChange::ToolExecutionCreated { .. } => "tool:execution_created",
            StateChange::ToolExecutionTransitioned { .. } => "tool:execution_transitioned",
            StateChange::ApprovalRecorded { .. } => "tool:approval_recorded",
        }
    }
}
