// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool execution engine: the human-in-the-loop state machine.
//!
//! Every status change is its own store commit, so a tool with external
//! side effects never runs under a dispatch transaction. Implementation
//! failures (including panics) are captured on the execution row and do
//! not propagate.

use crate::error::EngineError;
use crate::registry::ToolRegistry;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use troupe_core::{
    AgentId, ApprovalDecision, Clock, HumanApproval, InstallationId, JsonMap, ToolExecution,
    ToolExecutionId, ToolExecutionStatus, ToolFailure, UserId,
};
use troupe_storage::Store;

/// Drives tool executions through pending → (approval) → executing →
/// completed/failed.
pub struct ToolEngine<C: Clock> {
    store: Arc<Store>,
    registry: ToolRegistry,
    clock: C,
}

impl<C: Clock> ToolEngine<C> {
    pub fn new(store: Arc<Store>, registry: ToolRegistry, clock: C) -> Self {
        Self { store, registry, clock }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Submit a tool call on behalf of an agent.
    ///
    /// Unknown tools are an input error. Gated tools park in `pending`
    /// until a reviewer decides; ungated tools run synchronously, with
    /// the outcome recorded on the returned execution.
    pub fn execute_tool(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        installation_id: InstallationId,
        tool_id: &str,
        payload: JsonMap,
    ) -> Result<ToolExecution, EngineError> {
        let definition = self
            .store
            .get_tool_definition(tool_id)
            .ok_or_else(|| EngineError::ToolNotFound(tool_id.to_string()))?;

        let now = self.clock.epoch_ms();
        let execution = ToolExecution {
            id: ToolExecutionId::new(),
            user_id: user_id.clone(),
            agent_id: agent_id.clone(),
            installation_id,
            tool_id: tool_id.to_string(),
            payload,
            status: ToolExecutionStatus::Pending,
            result: None,
            error: None,
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.store.create_tool_execution(execution.clone())?;

        if definition.requires_human_approval.requires_approval() {
            tracing::info!(
                execution = %execution.id,
                %tool_id,
                user = %user_id,
                risk = %definition.risk_level,
                "tool execution awaiting approval"
            );
            return Ok(execution);
        }

        self.run(&execution.id)
    }

    /// Record a reviewer decision for a pending execution.
    ///
    /// Deliberately not idempotent: deciding a non-pending execution is
    /// an `InvalidState` error, never silently absorbed.
    pub fn approve_tool_execution(
        &self,
        execution_id: &ToolExecutionId,
        reviewer_id: &UserId,
        decision: ApprovalDecision,
        comment: Option<String>,
    ) -> Result<ToolExecution, EngineError> {
        let execution = self
            .store
            .get_tool_execution(execution_id)
            .ok_or_else(|| EngineError::InvalidState(format!("tool execution {execution_id} not found")))?;
        let definition = self
            .store
            .get_tool_definition(&execution.tool_id)
            .ok_or_else(|| EngineError::ToolNotFound(execution.tool_id.clone()))?;
        // Approvals only exist for tools that require them.
        if !definition.requires_human_approval.requires_approval() {
            return Err(EngineError::InvalidState(format!(
                "tool {} does not require approval",
                execution.tool_id
            )));
        }

        let now = self.clock.epoch_ms();
        let approval = HumanApproval {
            execution_id: *execution_id,
            reviewer_id: reviewer_id.clone(),
            decision,
            comment,
            created_at_ms: now,
        };
        let next = match decision {
            ApprovalDecision::Approved => ToolExecutionStatus::Approved,
            ApprovalDecision::Rejected => ToolExecutionStatus::Rejected,
        };
        let updated = self.store.apply_approval(approval, next, now)?;
        tracing::info!(
            execution = %execution_id,
            reviewer = %reviewer_id,
            %decision,
            "tool execution reviewed"
        );

        match decision {
            ApprovalDecision::Approved => self.run(execution_id),
            ApprovalDecision::Rejected => Ok(updated),
        }
    }

    /// Drive an execution through executing → completed/failed.
    fn run(&self, execution_id: &ToolExecutionId) -> Result<ToolExecution, EngineError> {
        let executing = self.store.transition_tool_execution(
            execution_id,
            ToolExecutionStatus::Executing,
            None,
            None,
            self.clock.epoch_ms(),
        )?;

        let outcome = match self.registry.get(&executing.tool_id) {
            Some(tool) => {
                let payload = executing.payload.clone();
                std::panic::catch_unwind(AssertUnwindSafe(|| tool.execute(&payload)))
                    .unwrap_or_else(|panic| {
                        Err(ToolFailure::new(format!("tool panicked: {}", panic_message(&panic))))
                    })
            }
            None => Err(ToolFailure::new("tool implementation not registered")),
        };

        let now = self.clock.epoch_ms();
        let finished = match outcome {
            Ok(result) => self.store.transition_tool_execution(
                execution_id,
                ToolExecutionStatus::Completed,
                Some(result),
                None,
                now,
            )?,
            Err(failure) => {
                tracing::warn!(
                    execution = %execution_id,
                    tool_id = %executing.tool_id,
                    error = %failure,
                    "tool execution failed"
                );
                self.store.transition_tool_execution(
                    execution_id,
                    ToolExecutionStatus::Failed,
                    None,
                    Some(failure.to_string()),
                    now,
                )?
            }
        };
        Ok(finished)
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
