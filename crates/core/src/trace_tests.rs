// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    pending = { TraceStatus::Pending, false },
    running = { TraceStatus::Running, false },
    completed = { TraceStatus::Completed, true },
    failed = { TraceStatus::Failed, true },
)]
fn terminal_statuses(status: TraceStatus, expected: bool) {
    assert_eq!(status.is_terminal(), expected);
}

#[test]
fn started_trace_is_running_and_unfinished() {
    let trace = ExecutionTrace::started(
        EventId::from_string("evt-1"),
        AgentId::new("cooking"),
        InstallationId::from_string("ins-1"),
        5_000,
    );

    assert_eq!(trace.status, TraceStatus::Running);
    assert_eq!(trace.started_at_ms, 5_000);
    assert!(trace.finished_at_ms.is_none());
    assert!(trace.error.is_none());
    assert!(trace.annotations.is_empty());
}

#[test]
fn empty_annotations_are_omitted_from_json() {
    let trace = ExecutionTrace::started(
        EventId::from_string("evt-1"),
        AgentId::new("cooking"),
        InstallationId::from_string("ins-1"),
        0,
    );
    let json = serde_json::to_value(&trace).unwrap();
    assert!(json.get("annotations").is_none());
    assert!(json.get("error").is_none());
}
