// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod cascade;
mod dispatch;
mod install;

use crate::cache::MemoryCache;
use crate::config::EngineConfig;
use crate::orchestrator::Orchestrator;
use std::sync::Arc;
use tempfile::TempDir;
use troupe_core::test_support::ScriptedAgent;
use troupe_core::{
    AgentId, AgentInstallation, ApprovalMode, FakeClock, JsonMap, RiskLevel, ToolDefinition,
    UserId,
};
use troupe_storage::Store;

pub(crate) struct Harness {
    _dir: TempDir,
    pub orch: Orchestrator<FakeClock>,
    pub clock: FakeClock,
    pub user: UserId,
}

/// Orchestrator on a fresh store with one user and an in-memory cache.
pub(crate) fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

pub(crate) fn harness_with(config: EngineConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let clock = FakeClock::new();
    let orch = Orchestrator::new(store, config, clock.clone())
        .with_cache(Arc::new(MemoryCache::new(clock.clone())));
    let user = UserId::new("user-1");
    orch.create_user(&user, JsonMap::new()).unwrap();
    Harness { _dir: dir, orch, clock, user }
}

impl Harness {
    /// Register the agent's manifest and implementation, then install it.
    pub async fn install(&self, agent: ScriptedAgent) -> AgentInstallation {
        let manifest = troupe_core::Agent::manifest(&agent);
        let agent_id = manifest.agent_id.clone();
        let version = manifest.version.clone();
        self.orch.register_manifest(manifest).unwrap();
        self.orch.register_agent(Arc::new(agent));
        self.orch.install_agent(&self.user, &agent_id, &version, JsonMap::new()).await.unwrap()
    }

    /// Define a tool in the catalog.
    pub fn define_tool(&self, tool_id: &str, mode: ApprovalMode) {
        self.orch
            .define_tool(ToolDefinition {
                tool_id: tool_id.into(),
                description: String::new(),
                requires_human_approval: mode,
                approval_role: None,
                risk_level: RiskLevel::Low,
            })
            .unwrap();
    }

    pub fn agent(&self, id: &str) -> AgentId {
        AgentId::new(id)
    }
}
