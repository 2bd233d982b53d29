// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    always = { ApprovalMode::Always, true },
    optional = { ApprovalMode::Optional, true },
    never = { ApprovalMode::Never, false },
)]
fn approval_modes(mode: ApprovalMode, gated: bool) {
    assert_eq!(mode.requires_approval(), gated);
}

#[parameterized(
    pending_to_approved = { ToolExecutionStatus::Pending, ToolExecutionStatus::Approved, true },
    pending_to_rejected = { ToolExecutionStatus::Pending, ToolExecutionStatus::Rejected, true },
    pending_to_executing = { ToolExecutionStatus::Pending, ToolExecutionStatus::Executing, true },
    pending_to_completed = { ToolExecutionStatus::Pending, ToolExecutionStatus::Completed, false },
    approved_to_executing = { ToolExecutionStatus::Approved, ToolExecutionStatus::Executing, true },
    approved_to_rejected = { ToolExecutionStatus::Approved, ToolExecutionStatus::Rejected, false },
    executing_to_completed = { ToolExecutionStatus::Executing, ToolExecutionStatus::Completed, true },
    executing_to_failed = { ToolExecutionStatus::Executing, ToolExecutionStatus::Failed, true },
    executing_to_approved = { ToolExecutionStatus::Executing, ToolExecutionStatus::Approved, false },
    rejected_is_terminal = { ToolExecutionStatus::Rejected, ToolExecutionStatus::Executing, false },
    completed_is_terminal = { ToolExecutionStatus::Completed, ToolExecutionStatus::Failed, false },
    failed_is_terminal = { ToolExecutionStatus::Failed, ToolExecutionStatus::Executing, false },
)]
fn transition_table(
    from: ToolExecutionStatus,
    to: ToolExecutionStatus,
    allowed: bool,
) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[parameterized(
    pending = { ToolExecutionStatus::Pending, false },
    approved = { ToolExecutionStatus::Approved, false },
    executing = { ToolExecutionStatus::Executing, false },
    rejected = { ToolExecutionStatus::Rejected, true },
    completed = { ToolExecutionStatus::Completed, true },
    failed = { ToolExecutionStatus::Failed, true },
)]
fn terminal_statuses(status: ToolExecutionStatus, expected: bool) {
    assert_eq!(status.is_terminal(), expected);
}

#[test]
fn terminal_statuses_admit_no_transitions() {
    use ToolExecutionStatus::*;
    let all = [Pending, Approved, Rejected, Executing, Completed, Failed];
    for from in all.iter().filter(|s| s.is_terminal()) {
        for to in all {
            assert!(!from.can_transition_to(to), "{from} -> {to} should be illegal");
        }
    }
}

#[test]
fn tool_definition_builder_defaults() {
    let def = ToolDefinition::builder().build();
    assert_eq!(def.requires_human_approval, ApprovalMode::Never);
    assert_eq!(def.risk_level, RiskLevel::Low);
    assert!(def.approval_role.is_none());
}

#[test]
fn execution_status_serde_uses_snake_case() {
    let json = serde_json::to_string(&ToolExecutionStatus::Executing).unwrap();
    assert_eq!(json, "\"executing\"");
}
