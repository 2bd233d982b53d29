// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool definitions, executions, and the human-approval gate.
//!
//! A tool execution is the only side-effectful thing an agent can ask
//! for. Its lifecycle is a small state machine; every transition is
//! validated against [`ToolExecutionStatus::can_transition_to`] before it
//! is committed.

use crate::installation::InstallationId;
use crate::json::JsonMap;
use crate::manifest::AgentId;
use crate::user::UserId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a tool execution.
    pub struct ToolExecutionId("tex-");
}

/// Whether a tool call must pass a human reviewer before running.
///
/// `Optional` is treated as requiring approval: a reviewer may waive
/// nothing, only approve or reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    Always,
    Never,
    Optional,
}

crate::simple_display! {
    ApprovalMode {
        Always => "always",
        Never => "never",
        Optional => "optional",
    }
}

impl ApprovalMode {
    pub fn requires_approval(&self) -> bool {
        matches!(self, ApprovalMode::Always | ApprovalMode::Optional)
    }
}

/// Coarse risk classification for reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

crate::simple_display! {
    RiskLevel {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

/// Catalog entry for a tool, keyed by `tool_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub tool_id: String,
    #[serde(default)]
    pub description: String,
    pub requires_human_approval: ApprovalMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_role: Option<String>,
    pub risk_level: RiskLevel,
}

crate::builder! {
    pub struct ToolDefinitionBuilder => ToolDefinition {
        into {
            tool_id: String = "test_tool",
            description: String = "",
        }
        set {
            requires_human_approval: ApprovalMode = ApprovalMode::Never,
            risk_level: RiskLevel = RiskLevel::Low,
        }
        computed {
            approval_role: Option<String> = None,
        }
    }
}

/// Status of a tool execution.
///
/// ```text
///             submit
///     (∅) ─────────────► pending ──► rejected
///                           │
///                           ├──► executing ─► completed | failed   (no approval needed)
///                           └──► approved ──► executing ─► …       (after human approval)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolExecutionStatus {
    Pending,
    Approved,
    Rejected,
    Executing,
    Completed,
    Failed,
}

crate::simple_display! {
    ToolExecutionStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Executing => "executing",
        Completed => "completed",
        Failed => "failed",
    }
}

impl ToolExecutionStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ToolExecutionStatus::Rejected
                | ToolExecutionStatus::Completed
                | ToolExecutionStatus::Failed
        )
    }

    /// Legal state-machine edges.
    pub fn can_transition_to(&self, next: ToolExecutionStatus) -> bool {
        use ToolExecutionStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Pending, Executing)
                | (Approved, Executing)
                | (Executing, Completed)
                | (Executing, Failed)
        )
    }
}

/// One tool call requested by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub id: ToolExecutionId,
    pub user_id: UserId,
    pub agent_id: AgentId,
    pub installation_id: InstallationId,
    pub tool_id: String,
    #[serde(default)]
    pub payload: JsonMap,
    pub status: ToolExecutionStatus,
    /// Result mapping returned by the tool implementation on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Reviewer decision for a pending execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

crate::simple_display! {
    ApprovalDecision {
        Approved => "approved",
        Rejected => "rejected",
    }
}

/// At most one approval exists per tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanApproval {
    pub execution_id: ToolExecutionId,
    pub reviewer_id: UserId,
    pub decision: ApprovalDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at_ms: u64,
}

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;
