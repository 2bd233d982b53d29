// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-local registries for agent and tool implementations.
//!
//! Implementations are plugins registered at startup. The catalog
//! (manifests, tool definitions) lives in the store; these registries
//! only map ids to code.

use crate::error::EngineError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use troupe_core::{Agent, ManifestKey, Tool};

/// `(agent_id, version)` → implementation.
#[derive(Default)]
pub struct AgentRegistry {
    agents: Mutex<HashMap<String, Arc<dyn Agent>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation under its manifest's key.
    pub fn register(&self, agent: Arc<dyn Agent>) {
        let key = agent.manifest().key();
        tracing::info!(agent = %key, "agent registered");
        self.agents.lock().insert(key.to_string(), agent);
    }

    /// Look up an implementation; unregistered keys are an input error.
    pub fn get(&self, key: &ManifestKey) -> Result<Arc<dyn Agent>, EngineError> {
        self.agents
            .lock()
            .get(&key.to_string())
            .cloned()
            .ok_or_else(|| EngineError::AgentNotRegistered(key.clone()))
    }
}

/// `tool_id` → implementation.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Mutex<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool_id: impl Into<String>, tool: Arc<dyn Tool>) {
        let tool_id = tool_id.into();
        tracing::info!(%tool_id, "tool registered");
        self.tools.lock().insert(tool_id, tool);
    }

    pub fn get(&self, tool_id: &str) -> Option<Arc<dyn Tool>> {
        self.tools.lock().get(tool_id).cloned()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
