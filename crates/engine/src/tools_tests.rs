// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::tempdir;
use troupe_core::test_support::{payload, RecordingTool};
use troupe_core::{ApprovalMode, FakeClock, RiskLevel, ToolDefinition};

struct Fixture {
    _dir: tempfile::TempDir,
    engine: ToolEngine<FakeClock>,
    user: UserId,
}

fn fixture(mode: ApprovalMode) -> Fixture {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    store.create_user(&UserId::new("user-1"), JsonMap::new(), 1).unwrap();
    store
        .define_tool(ToolDefinition {
            tool_id: "send_notification".into(),
            description: "test".into(),
            requires_human_approval: mode,
            approval_role: None,
            risk_level: RiskLevel::Low,
        })
        .unwrap();
    Fixture {
        _dir: dir,
        engine: ToolEngine::new(store, ToolRegistry::new(), FakeClock::new()),
        user: UserId::new("user-1"),
    }
}

fn submit(fixture: &Fixture) -> ToolExecution {
    fixture
        .engine
        .execute_tool(
            &fixture.user,
            &AgentId::new("cooking"),
            InstallationId::from_string("ins-1"),
            "send_notification",
            payload(json!({"message": "hi"})),
        )
        .unwrap()
}

#[test]
fn unknown_tool_is_an_input_error() {
    let fixture = fixture(ApprovalMode::Never);
    let err = fixture
        .engine
        .execute_tool(
            &fixture.user,
            &AgentId::new("cooking"),
            InstallationId::from_string("ins-1"),
            "no_such_tool",
            JsonMap::new(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::ToolNotFound(_)));
}

#[test]
fn ungated_tool_runs_synchronously() {
    let fixture = fixture(ApprovalMode::Never);
    let tool = RecordingTool::ok(payload(json!({"sent": true})));
    let calls = tool.calls();
    fixture.engine.registry().register("send_notification", Arc::new(tool));

    let execution = submit(&fixture);

    assert_eq!(execution.status, ToolExecutionStatus::Completed);
    assert_eq!(execution.result, Some(payload(json!({"sent": true}))));
    assert_eq!(calls.lock().len(), 1);
}

#[test]
fn ungated_tool_failure_is_captured() {
    let fixture = fixture(ApprovalMode::Never);
    fixture
        .engine
        .registry()
        .register("send_notification", Arc::new(RecordingTool::failing("smtp down")));

    let execution = submit(&fixture);

    assert_eq!(execution.status, ToolExecutionStatus::Failed);
    assert_eq!(execution.error.as_deref(), Some("smtp down"));
}

#[test]
fn missing_implementation_fails_the_execution() {
    let fixture = fixture(ApprovalMode::Never);

    let execution = submit(&fixture);

    assert_eq!(execution.status, ToolExecutionStatus::Failed);
    assert_eq!(execution.error.as_deref(), Some("tool implementation not registered"));
}

#[test]
fn gated_tool_parks_pending_without_invoking_the_tool() {
    let fixture = fixture(ApprovalMode::Always);
    let tool = RecordingTool::ok(JsonMap::new());
    let calls = tool.calls();
    fixture.engine.registry().register("send_notification", Arc::new(tool));

    let execution = submit(&fixture);

    assert_eq!(execution.status, ToolExecutionStatus::Pending);
    assert!(calls.lock().is_empty());
}

#[test]
fn optional_mode_also_gates() {
    let fixture = fixture(ApprovalMode::Optional);
    let execution = submit(&fixture);
    assert_eq!(execution.status, ToolExecutionStatus::Pending);
}

#[test]
fn approval_runs_the_tool() {
    let fixture = fixture(ApprovalMode::Always);
    let tool = RecordingTool::ok(payload(json!({"sent": true})));
    let calls = tool.calls();
    fixture.engine.registry().register("send_notification", Arc::new(tool));
    let execution = submit(&fixture);

    let updated = fixture
        .engine
        .approve_tool_execution(
            &execution.id,
            &fixture.user,
            ApprovalDecision::Approved,
            Some("looks fine".into()),
        )
        .unwrap();

    assert_eq!(updated.status, ToolExecutionStatus::Completed);
    assert_eq!(calls.lock().len(), 1);
}

#[test]
fn rejection_is_terminal_and_never_invokes_the_tool() {
    let fixture = fixture(ApprovalMode::Always);
    let tool = RecordingTool::ok(JsonMap::new());
    let calls = tool.calls();
    fixture.engine.registry().register("send_notification", Arc::new(tool));
    let execution = submit(&fixture);

    let updated = fixture
        .engine
        .approve_tool_execution(&execution.id, &fixture.user, ApprovalDecision::Rejected, None)
        .unwrap();
    assert_eq!(updated.status, ToolExecutionStatus::Rejected);
    assert!(calls.lock().is_empty());

    // Deciding again is an invalid state, not a silent no-op.
    let err = fixture
        .engine
        .approve_tool_execution(&execution.id, &fixture.user, ApprovalDecision::Approved, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert!(calls.lock().is_empty());
}

#[test]
fn double_approval_never_double_executes() {
    let fixture = fixture(ApprovalMode::Always);
    let tool = RecordingTool::ok(JsonMap::new());
    let calls = tool.calls();
    fixture.engine.registry().register("send_notification", Arc::new(tool));
    let execution = submit(&fixture);

    fixture
        .engine
        .approve_tool_execution(&execution.id, &fixture.user, ApprovalDecision::Approved, None)
        .unwrap();
    let err = fixture
        .engine
        .approve_tool_execution(&execution.id, &fixture.user, ApprovalDecision::Approved, None)
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidState(_)));
    assert_eq!(calls.lock().len(), 1);
}

#[test]
fn approving_an_ungated_tool_is_invalid() {
    let fixture = fixture(ApprovalMode::Never);
    fixture
        .engine
        .registry()
        .register("send_notification", Arc::new(RecordingTool::ok(JsonMap::new())));
    let execution = submit(&fixture);

    let err = fixture
        .engine
        .approve_tool_execution(&execution.id, &fixture.user, ApprovalDecision::Approved, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}
