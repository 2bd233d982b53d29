// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator: installation flow, event dispatch, control surface.
//!
//! One instance owns the store, the registries, the tool engine, and the
//! per-user locks. The control-surface methods are transport-agnostic;
//! an HTTP or gRPC layer is an external collaborator.

mod dispatch;

use crate::cache::{NullCache, ProjectionCache};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::locks::UserLocks;
use crate::registry::{AgentRegistry, ToolRegistry};
use crate::tools::ToolEngine;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use troupe_core::{
    Agent, AgentContext, AgentId, AgentInstallation, AgentManifest, ApprovalDecision, Clock,
    EventRecord, ExecutionTrace, JsonMap, ManifestKey, SystemClock, Tool, ToolDefinition,
    ToolExecution, ToolExecutionId, UserId,
};
use troupe_storage::Store;

/// Multi-tenant agent orchestration core.
pub struct Orchestrator<C: Clock = SystemClock> {
    store: Arc<Store>,
    agents: AgentRegistry,
    tools: ToolEngine<C>,
    cache: Arc<dyn ProjectionCache>,
    locks: UserLocks,
    config: EngineConfig,
    clock: C,
    cancel: CancellationToken,
}

impl Orchestrator<SystemClock> {
    /// Open the store at the configured state dir and build an
    /// orchestrator on the system clock.
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let store = Arc::new(Store::open(&config.state_dir)?);
        Ok(Self::new(store, config, SystemClock))
    }
}

impl<C: Clock + 'static> Orchestrator<C> {
    pub fn new(store: Arc<Store>, config: EngineConfig, clock: C) -> Self {
        Self {
            tools: ToolEngine::new(Arc::clone(&store), ToolRegistry::new(), clock.clone()),
            store,
            agents: AgentRegistry::new(),
            cache: Arc::new(NullCache),
            locks: UserLocks::new(),
            config,
            clock,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a projection cache in front of the store (default: none).
    pub fn with_cache(mut self, cache: Arc<dyn ProjectionCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Token observed between agents and before cascades; cancelling it
    /// stops in-flight dispatches at the next boundary.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    // ── Startup registration ────────────────────────────────────────────

    /// Register an agent implementation under its manifest's key.
    pub fn register_agent(&self, agent: Arc<dyn Agent>) {
        self.agents.register(agent);
    }

    /// Register a tool implementation under its id.
    pub fn register_tool(&self, tool_id: impl Into<String>, tool: Arc<dyn Tool>) {
        self.tools.registry().register(tool_id, tool);
    }

    /// Publish a manifest into the catalog.
    pub fn register_manifest(&self, manifest: AgentManifest) -> Result<(), EngineError> {
        Ok(self.store.register_manifest(manifest)?)
    }

    /// Publish a tool definition into the catalog.
    pub fn define_tool(&self, definition: ToolDefinition) -> Result<(), EngineError> {
        Ok(self.store.define_tool(definition)?)
    }

    pub fn create_user(&self, user_id: &UserId, profile: JsonMap) -> Result<(), EngineError> {
        Ok(self.store.create_user(user_id, profile, self.clock.epoch_ms())?)
    }

    // ── Control surface ─────────────────────────────────────────────────

    /// Active manifests in the catalog.
    pub fn list_agents(&self) -> Vec<AgentManifest> {
        self.store.list_active_manifests()
    }

    /// One active manifest.
    pub fn get_agent(&self, agent_id: &AgentId, version: &str) -> Result<AgentManifest, EngineError> {
        let key = ManifestKey::new(agent_id.clone(), version);
        self.store
            .get_manifest(&key)
            .filter(|m| m.is_active())
            .ok_or(EngineError::ManifestNotFound(key))
    }

    /// Install an agent for a user and run its onboarding.
    ///
    /// Onboarding is transactional with the installation commit: nothing
    /// is persisted unless `onboard` succeeds, and the installation plus
    /// its initial memory commit as one batch.
    pub async fn install_agent(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        version: &str,
        inputs: JsonMap,
    ) -> Result<AgentInstallation, EngineError> {
        let lock = self.locks.for_user(user_id);
        let _guard = lock.lock().await;

        let key = ManifestKey::new(agent_id.clone(), version);
        self.store
            .get_manifest(&key)
            .filter(|m| m.is_active())
            .ok_or_else(|| EngineError::ManifestNotFound(key.clone()))?;

        if !self.store.user_exists(user_id) {
            return Err(EngineError::UserNotFound(user_id.clone()));
        }
        if self.store.find_installation(user_id, agent_id, version).is_some() {
            return Err(EngineError::AlreadyInstalled {
                user_id: user_id.clone(),
                agent_id: agent_id.clone(),
                version: version.to_string(),
            });
        }

        let agent = self.agents.get(&key)?;

        let (user_profile, shared_context) = self.store.read_user_context(user_id)?;
        let initial_context = AgentContext {
            user_profile,
            shared_context,
            agent_memory: JsonMap::new(),
            recent_events: Vec::new(),
        };
        let memory = agent
            .onboard(&inputs, &initial_context)
            .map_err(|err| EngineError::OnboardingFailed(err.to_string()))?;

        let installation = self.store.create_installation(
            user_id,
            agent_id,
            version,
            memory,
            self.clock.epoch_ms(),
        )?;

        self.cache.invalidate_user_installations(user_id).await;
        tracing::info!(
            user = %user_id,
            agent = %key,
            installation = %installation.id,
            "agent installed"
        );
        Ok(installation)
    }

    /// Active installations for a user.
    pub fn list_user_agents(&self, user_id: &UserId) -> Vec<AgentInstallation> {
        self.store.list_active_installations(user_id)
    }

    /// Submit an externally-originated event and dispatch it.
    pub async fn create_event(
        &self,
        user_id: &UserId,
        event_type: &str,
        payload: JsonMap,
    ) -> Result<EventRecord, EngineError> {
        let lock = self.locks.for_user(user_id);
        let _guard = lock.lock().await;
        self.dispatch(user_id, event_type.to_string(), payload, None, 0).await
    }

    /// Newest-first events for a user.
    pub fn list_user_events(&self, user_id: &UserId, limit: usize) -> Vec<EventRecord> {
        self.store.list_recent_events(user_id, limit)
    }

    /// Traces recorded for one event, in dispatch order.
    pub fn list_event_traces(&self, event_id: &troupe_core::EventId) -> Vec<ExecutionTrace> {
        self.store.list_traces_for_event(event_id)
    }

    /// The user's shared context, cache-through.
    pub async fn read_shared_context(&self, user_id: &UserId) -> Result<JsonMap, EngineError> {
        if let Some(context) = self.cache.get_shared_context(user_id).await {
            return Ok(context);
        }
        let (_, shared_context) = self.store.read_user_context(user_id)?;
        self.cache.put_shared_context(user_id, &shared_context).await;
        Ok(shared_context)
    }

    /// Tool executions awaiting approval for a user.
    pub fn list_pending_tools(&self, user_id: &UserId) -> Vec<ToolExecution> {
        self.store.list_pending_tool_executions(user_id)
    }

    /// Review a pending tool execution.
    pub fn approve_tool(
        &self,
        reviewer_id: &UserId,
        execution_id: &ToolExecutionId,
        decision: ApprovalDecision,
        comment: Option<String>,
    ) -> Result<ToolExecution, EngineError> {
        self.tools.approve_tool_execution(execution_id, reviewer_id, decision, comment)
    }
}

#[cfg(test)]
#[path = "../orchestrator_tests/mod.rs"]
mod tests;
