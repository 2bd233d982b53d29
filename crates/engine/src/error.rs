// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! Input errors surface to the caller with no effects applied. Per-agent
//! and per-tool runtime failures are contained as durable trace/execution
//! rows and never reach here. Storage errors propagate unchanged.

use thiserror::Error;
use troupe_core::{ManifestKey, UserId};
use troupe_storage::StoreError;

/// Errors surfaced by the orchestration engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("manifest {0} not found or not active")]
    ManifestNotFound(ManifestKey),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("agent {agent_id}:{version} already installed for user {user_id}")]
    AlreadyInstalled { user_id: UserId, agent_id: troupe_core::AgentId, version: String },

    #[error("agent {0} not registered")]
    AgentNotRegistered(ManifestKey),

    #[error("tool {0} not found")]
    ToolNotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("onboarding failed: {0}")]
    OnboardingFailed(String),

    #[error("max event depth ({max}) reached")]
    DepthExceeded { max: u32 },

    #[error("dispatch cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        // Constraint violations detected by the system of record surface
        // as the matching input error; everything else is a storage fault.
        match err {
            StoreError::UserNotFound(user_id) => EngineError::UserNotFound(user_id),
            StoreError::AlreadyInstalled { user_id, agent_id, version } => {
                EngineError::AlreadyInstalled { user_id, agent_id, version }
            }
            StoreError::InvalidTransition { from, to } => {
                EngineError::InvalidState(format!("tool execution is {from}, cannot become {to}"))
            }
            StoreError::ExecutionNotFound(id) => {
                EngineError::InvalidState(format!("tool execution {id} not found"))
            }
            other => EngineError::Storage(other),
        }
    }
}
