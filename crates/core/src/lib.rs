// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! troupe-core: domain model and agent SDK contract for the Troupe
//! orchestration core.
//!
//! Everything in this crate is pure data plus the two plugin traits
//! ([`Agent`] and [`Tool`]). No I/O happens here; persistence lives in
//! `troupe-storage` and runtime behavior in `troupe-engine`.

pub mod macros;

pub mod clock;
pub mod event;
pub mod id;
pub mod installation;
pub mod json;
pub mod manifest;
pub mod sdk;
pub mod tool;
pub mod trace;
pub mod user;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{EventId, EventRecord};
pub use id::IdBuf;
pub use installation::{AgentInstallation, InstallationId, InstallationStatus};
pub use json::{shallow_merge, JsonMap};
pub use manifest::{AgentId, AgentManifest, ManifestKey, ManifestStatus, Permissions};
pub use sdk::{
    Agent, AgentContext, AgentFailure, AgentResult, AgentStatus, EmittedEvent, EventView, Tool,
    ToolFailure, ToolRequest,
};
pub use tool::{
    ApprovalDecision, ApprovalMode, HumanApproval, RiskLevel, ToolDefinition, ToolExecution,
    ToolExecutionId, ToolExecutionStatus,
};
pub use trace::{ExecutionTrace, TraceId, TraceStatus};
pub use user::UserId;
