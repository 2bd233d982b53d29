//! Shared spec harness.

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use troupe_core::test_support::{payload, ScriptedAgent};
use troupe_core::{
    AgentId, AgentInstallation, ApprovalMode, FakeClock, JsonMap, RiskLevel, ToolDefinition,
    UserId,
};
use troupe_engine::{EngineConfig, MemoryCache, Orchestrator};
use troupe_storage::Store;

pub struct Harness {
    pub dir: TempDir,
    pub orch: Orchestrator<FakeClock>,
    pub clock: FakeClock,
    pub user: UserId,
}

/// A fresh store with one user ("user-1") and an in-memory cache.
pub fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let clock = FakeClock::new();
    let orch = Orchestrator::new(store, EngineConfig::default(), clock.clone())
        .with_cache(Arc::new(MemoryCache::new(clock.clone())));
    let user = UserId::new("user-1");
    orch.create_user(&user, payload(json!({"name": "Ada"}))).unwrap();
    Harness { dir, orch, clock, user }
}

impl Harness {
    /// Register manifest + implementation, then install for the user.
    pub async fn install(&self, agent: ScriptedAgent) -> AgentInstallation {
        let manifest = troupe_core::Agent::manifest(&agent);
        let agent_id = manifest.agent_id.clone();
        let version = manifest.version.clone();
        self.orch.register_manifest(manifest).unwrap();
        self.orch.register_agent(Arc::new(agent));
        self.orch.install_agent(&self.user, &agent_id, &version, JsonMap::new()).await.unwrap()
    }

    pub fn define_tool(&self, tool_id: &str, mode: ApprovalMode) {
        self.orch
            .define_tool(ToolDefinition {
                tool_id: tool_id.into(),
                description: String::new(),
                requires_human_approval: mode,
                approval_role: None,
                risk_level: RiskLevel::Medium,
            })
            .unwrap();
    }

    pub fn agent(&self, id: &str) -> AgentId {
        AgentId::new(id)
    }

    /// All the user's events, oldest first.
    pub fn events_oldest_first(&self) -> Vec<troupe_core::EventRecord> {
        let mut events = self.orch.list_user_events(&self.user, 1000);
        events.reverse();
        events
    }
}
