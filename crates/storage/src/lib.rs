// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! troupe-storage: the system of record.
//!
//! State is derived from an append-only change journal (see
//! [`change::StateChange`]) replayed into [`state::CoreState`], with
//! periodic zstd snapshots for bounded recovery time. A commit appends
//! one journal entry holding the whole batch and flushes it before the
//! in-memory state is touched: the flush is the durability point, and a
//! batch is all-or-nothing.

pub mod change;
pub mod journal;
mod snapshot;
pub mod state;

pub use change::StateChange;
pub use journal::{Journal, JournalEntry};
pub use state::{CoreState, UserRecord};

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use troupe_core::{
    AgentId, AgentInstallation, AgentManifest, EventId, EventRecord, ExecutionTrace,
    HumanApproval, InstallationId, InstallationStatus, JsonMap, ManifestKey, ToolDefinition,
    ToolExecution, ToolExecutionId, ToolExecutionStatus, TraceId, TraceStatus, UserId,
};

/// Errors from the store.
///
/// Constraint violations (`UserExists`, `AlreadyInstalled`,
/// `InvalidTransition`, …) are detected before anything is journaled, so
/// a failed call leaves no partial effects.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("user {0} already exists")]
    UserExists(UserId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("agent {agent_id}:{version} already installed for user {user_id}")]
    AlreadyInstalled { user_id: UserId, agent_id: AgentId, version: String },

    #[error("installation {0} not found")]
    InstallationNotFound(InstallationId),

    #[error("trace {0} not found")]
    TraceNotFound(TraceId),

    #[error("tool execution {0} not found")]
    ExecutionNotFound(ToolExecutionId),

    #[error("illegal tool execution transition: {from} -> {to}")]
    InvalidTransition { from: ToolExecutionStatus, to: ToolExecutionStatus },
}

/// Per-agent effects committed atomically with the trace finalize.
///
/// Context patches that are `None` (denied or empty) leave the target
/// untouched; the trace still finalizes in the same batch.
#[derive(Debug, Clone)]
pub struct AgentEffects {
    pub user_id: UserId,
    pub installation_id: InstallationId,
    pub trace_id: TraceId,
    pub trace_status: TraceStatus,
    pub trace_error: Option<String>,
    pub trace_annotations: Vec<String>,
    pub shared_context_patch: Option<JsonMap>,
    pub memory_patch: Option<JsonMap>,
    pub finished_at_ms: u64,
}

struct Inner {
    state: CoreState,
    journal: Journal,
}

/// The durable store: journal + snapshot + materialized state.
///
/// All access goes through one mutex; commits hold it across
/// journal-append and state-apply so readers never observe a half-applied
/// batch.
pub struct Store {
    inner: Mutex<Inner>,
    snapshot_path: PathBuf,
}

impl Store {
    /// Open (or create) a store rooted at `dir`.
    ///
    /// Loads the newest snapshot if present, then replays journal entries
    /// past its watermark.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let snapshot_path = dir.join("snapshot.zst");
        let (mut state, snapshot_seq) = match snapshot::read(&snapshot_path)? {
            Some(snapshot) => (snapshot.state, snapshot.seq),
            None => (CoreState::default(), 0),
        };

        let (mut journal, entries) = Journal::open(&dir.join("journal.log"))?;
        let mut replayed = 0usize;
        for entry in &entries {
            if entry.seq <= snapshot_seq {
                continue;
            }
            for change in &entry.changes {
                state.apply(change);
            }
            replayed += 1;
        }
        journal.advance_to(snapshot_seq);

        tracing::info!(
            dir = %dir.display(),
            snapshot_seq,
            replayed,
            "store opened"
        );

        Ok(Self { inner: Mutex::new(Inner { state, journal }), snapshot_path })
    }

    /// Run a closure against the materialized state.
    fn read<T>(&self, f: impl FnOnce(&CoreState) -> T) -> T {
        let inner = self.inner.lock();
        f(&inner.state)
    }

    /// Append a batch to the journal (flushing it) and apply it.
    fn commit_locked(inner: &mut Inner, changes: Vec<StateChange>) -> Result<(), StoreError> {
        let seq = inner.journal.append(&changes)?;
        for change in &changes {
            tracing::debug!(seq, change = change.name(), "committed");
            inner.state.apply(change);
        }
        Ok(())
    }

    /// Write a snapshot of the current state and truncate the journal.
    pub fn compact(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let snap =
            snapshot::Snapshot { seq: inner.journal.write_seq(), state: inner.state.clone() };
        snapshot::write(&self.snapshot_path, &snap)?;
        inner.journal.truncate()?;
        tracing::info!(seq = snap.seq, "store compacted");
        Ok(())
    }

    // ── Users and context ───────────────────────────────────────────────

    pub fn create_user(
        &self,
        user_id: &UserId,
        profile: JsonMap,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.state.users.contains_key(user_id.as_str()) {
            return Err(StoreError::UserExists(user_id.clone()));
        }
        Self::commit_locked(
            &mut inner,
            vec![StateChange::UserCreated {
                user_id: user_id.to_string(),
                profile,
                created_at_ms: now_ms,
            }],
        )
    }

    pub fn user_exists(&self, user_id: &UserId) -> bool {
        self.read(|state| state.users.contains_key(user_id.as_str()))
    }

    /// `(user_profile, shared_context)` for the user.
    pub fn read_user_context(&self, user_id: &UserId) -> Result<(JsonMap, JsonMap), StoreError> {
        self.read(|state| {
            state
                .users
                .get(user_id.as_str())
                .map(|user| (user.profile.clone(), user.shared_context.clone()))
                .ok_or_else(|| StoreError::UserNotFound(user_id.clone()))
        })
    }

    /// Shallow-merge a patch into the user's shared context.
    pub fn upsert_shared_context(
        &self,
        user_id: &UserId,
        patch: JsonMap,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.state.users.contains_key(user_id.as_str()) {
            return Err(StoreError::UserNotFound(user_id.clone()));
        }
        Self::commit_locked(
            &mut inner,
            vec![StateChange::SharedContextMerged { user_id: user_id.to_string(), patch }],
        )
    }

    // ── Catalog ─────────────────────────────────────────────────────────

    pub fn register_manifest(&self, manifest: AgentManifest) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::commit_locked(&mut inner, vec![StateChange::ManifestRegistered { manifest }])
    }

    pub fn get_manifest(&self, key: &ManifestKey) -> Option<AgentManifest> {
        self.read(|state| state.manifests.get(&key.to_string()).cloned())
    }

    /// Active manifests, ordered by `(agent_id, version)`.
    pub fn list_active_manifests(&self) -> Vec<AgentManifest> {
        self.read(|state| {
            let mut manifests: Vec<_> =
                state.manifests.values().filter(|m| m.is_active()).cloned().collect();
            manifests.sort_by(|a, b| a.key().to_string().cmp(&b.key().to_string()));
            manifests
        })
    }

    pub fn define_tool(&self, definition: ToolDefinition) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::commit_locked(&mut inner, vec![StateChange::ToolDefined { definition }])
    }

    pub fn get_tool_definition(&self, tool_id: &str) -> Option<ToolDefinition> {
        self.read(|state| state.tool_definitions.get(tool_id).cloned())
    }

    // ── Installations ───────────────────────────────────────────────────

    /// Atomically create an active installation plus its onboarded memory.
    ///
    /// Enforces the uniqueness constraint: at most one installation per
    /// `(user, agent_id, version)`, regardless of status history.
    pub fn create_installation(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        version: &str,
        memory: JsonMap,
        now_ms: u64,
    ) -> Result<AgentInstallation, StoreError> {
        let mut inner = self.inner.lock();
        if !inner.state.users.contains_key(user_id.as_str()) {
            return Err(StoreError::UserNotFound(user_id.clone()));
        }
        let duplicate = inner
            .state
            .installations
            .get(user_id.as_str())
            .is_some_and(|installs| {
                installs.values().any(|i| i.agent_id == *agent_id && i.version == version)
            });
        if duplicate {
            return Err(StoreError::AlreadyInstalled {
                user_id: user_id.clone(),
                agent_id: agent_id.clone(),
                version: version.to_string(),
            });
        }

        let installation = AgentInstallation {
            id: InstallationId::new(),
            user_id: user_id.clone(),
            agent_id: agent_id.clone(),
            version: version.to_string(),
            status: InstallationStatus::Active,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        Self::commit_locked(
            &mut inner,
            vec![StateChange::InstallationCreated { installation: installation.clone(), memory }],
        )?;
        Ok(installation)
    }

    /// Find the installation for `(user, agent_id, version)`, any status.
    pub fn find_installation(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        version: &str,
    ) -> Option<AgentInstallation> {
        self.read(|state| {
            state.installations.get(user_id.as_str()).and_then(|installs| {
                installs
                    .values()
                    .find(|i| i.agent_id == *agent_id && i.version == version)
                    .cloned()
            })
        })
    }

    /// Active installations in installation order.
    pub fn list_active_installations(&self, user_id: &UserId) -> Vec<AgentInstallation> {
        self.read(|state| {
            state
                .installations
                .get(user_id.as_str())
                .map(|installs| installs.values().filter(|i| i.is_active()).cloned().collect())
                .unwrap_or_default()
        })
    }

    /// The installation's private memory (empty if none has been written).
    pub fn read_agent_memory(&self, installation_id: &InstallationId) -> JsonMap {
        self.read(|state| {
            state.memories.get(installation_id.as_str()).cloned().unwrap_or_default()
        })
    }

    // ── Event log and traces ────────────────────────────────────────────

    /// Append an immutable event, assigning its id and timestamp.
    pub fn append_event(
        &self,
        user_id: &UserId,
        event_type: &str,
        source_agent: Option<AgentId>,
        payload: JsonMap,
        now_ms: u64,
    ) -> Result<EventRecord, StoreError> {
        let mut inner = self.inner.lock();
        if !inner.state.users.contains_key(user_id.as_str()) {
            return Err(StoreError::UserNotFound(user_id.clone()));
        }
        let event = EventRecord {
            id: EventId::new(),
            user_id: user_id.clone(),
            event_type: event_type.to_string(),
            source_agent,
            payload,
            created_at_ms: now_ms,
        };
        Self::commit_locked(&mut inner, vec![StateChange::EventAppended { event: event.clone() }])?;
        Ok(event)
    }

    /// Newest-first events for the user, up to `limit`.
    pub fn list_recent_events(&self, user_id: &UserId, limit: usize) -> Vec<EventRecord> {
        self.read(|state| {
            state
                .events
                .get(user_id.as_str())
                .map(|log| log.iter().rev().take(limit).cloned().collect())
                .unwrap_or_default()
        })
    }

    pub fn get_event(&self, user_id: &UserId, event_id: &EventId) -> Option<EventRecord> {
        self.read(|state| {
            state
                .events
                .get(user_id.as_str())
                .and_then(|log| log.iter().find(|e| e.id == *event_id).cloned())
        })
    }

    pub fn record_trace(&self, trace: ExecutionTrace) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::commit_locked(&mut inner, vec![StateChange::TraceRecorded { trace }])
    }

    /// Finalize a trace with no accompanying context effects.
    pub fn finalize_trace(
        &self,
        trace_id: &TraceId,
        status: TraceStatus,
        error: Option<String>,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.state.traces.contains_key(trace_id.as_str()) {
            return Err(StoreError::TraceNotFound(*trace_id));
        }
        Self::commit_locked(
            &mut inner,
            vec![StateChange::TraceFinalized {
                trace_id: trace_id.to_string(),
                status,
                error,
                annotations: Vec::new(),
                finished_at_ms: now_ms,
            }],
        )
    }

    /// Commit one agent's effects and its trace finalize as one batch.
    pub fn commit_agent_effects(&self, effects: AgentEffects) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.state.traces.contains_key(effects.trace_id.as_str()) {
            return Err(StoreError::TraceNotFound(effects.trace_id));
        }
        if !inner.state.memories.contains_key(effects.installation_id.as_str()) {
            return Err(StoreError::InstallationNotFound(effects.installation_id));
        }

        let mut changes = Vec::with_capacity(3);
        if let Some(patch) = effects.shared_context_patch.filter(|p| !p.is_empty()) {
            changes.push(StateChange::SharedContextMerged {
                user_id: effects.user_id.to_string(),
                patch,
            });
        }
        if let Some(patch) = effects.memory_patch.filter(|p| !p.is_empty()) {
            changes.push(StateChange::AgentMemoryMerged {
                installation_id: effects.installation_id.to_string(),
                patch,
            });
        }
        changes.push(StateChange::TraceFinalized {
            trace_id: effects.trace_id.to_string(),
            status: effects.trace_status,
            error: effects.trace_error,
            annotations: effects.trace_annotations,
            finished_at_ms: effects.finished_at_ms,
        });
        Self::commit_locked(&mut inner, changes)
    }

    /// Traces for one event, in creation order.
    pub fn list_traces_for_event(&self, event_id: &EventId) -> Vec<ExecutionTrace> {
        self.read(|state| {
            state.traces.values().filter(|t| t.event_id == *event_id).cloned().collect()
        })
    }

    // ── Tool executions ─────────────────────────────────────────────────

    pub fn create_tool_execution(&self, execution: ToolExecution) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::commit_locked(&mut inner, vec![StateChange::ToolExecutionCreated { execution }])
    }

    /// Apply one validated state-machine transition.
    pub fn transition_tool_execution(
        &self,
        execution_id: &ToolExecutionId,
        next: ToolExecutionStatus,
        result: Option<JsonMap>,
        error: Option<String>,
        now_ms: u64,
    ) -> Result<ToolExecution, StoreError> {
        let mut inner = self.inner.lock();
        let current = inner
            .state
            .tool_executions
            .get(execution_id.as_str())
            .ok_or(StoreError::ExecutionNotFound(*execution_id))?
            .status;
        if !current.can_transition_to(next) {
            return Err(StoreError::InvalidTransition { from: current, to: next });
        }
        Self::commit_locked(
            &mut inner,
            vec![StateChange::ToolExecutionTransitioned {
                execution_id: execution_id.to_string(),
                status: next,
                result,
                error,
                updated_at_ms: now_ms,
            }],
        )?;
        Self::updated_execution(&inner, execution_id)
    }

    /// Record a reviewer decision and the resulting transition atomically.
    ///
    /// The execution must still be `pending`; anything else is an illegal
    /// transition (approval is not idempotent by design).
    pub fn apply_approval(
        &self,
        approval: HumanApproval,
        next: ToolExecutionStatus,
        now_ms: u64,
    ) -> Result<ToolExecution, StoreError> {
        let mut inner = self.inner.lock();
        let execution_id = approval.execution_id;
        let current = inner
            .state
            .tool_executions
            .get(execution_id.as_str())
            .ok_or(StoreError::ExecutionNotFound(execution_id))?
            .status;
        if current != ToolExecutionStatus::Pending || !current.can_transition_to(next) {
            return Err(StoreError::InvalidTransition { from: current, to: next });
        }
        Self::commit_locked(
            &mut inner,
            vec![
                StateChange::ApprovalRecorded { approval },
                StateChange::ToolExecutionTransitioned {
                    execution_id: execution_id.to_string(),
                    status: next,
                    result: None,
                    error: None,
                    updated_at_ms: now_ms,
                },
            ],
        )?;
        Self::updated_execution(&inner, &execution_id)
    }

    fn updated_execution(
        inner: &Inner,
        execution_id: &ToolExecutionId,
    ) -> Result<ToolExecution, StoreError> {
        inner
            .state
            .tool_executions
            .get(execution_id.as_str())
            .cloned()
            .ok_or(StoreError::ExecutionNotFound(*execution_id))
    }

    pub fn get_tool_execution(&self, execution_id: &ToolExecutionId) -> Option<ToolExecution> {
        self.read(|state| state.tool_executions.get(execution_id.as_str()).cloned())
    }

    /// Pending executions for the user, in creation order.
    pub fn list_pending_tool_executions(&self, user_id: &UserId) -> Vec<ToolExecution> {
        self.read(|state| {
            state
                .tool_executions
                .values()
                .filter(|e| e.user_id == *user_id && e.status == ToolExecutionStatus::Pending)
                .cloned()
                .collect()
        })
    }

    pub fn get_approval(&self, execution_id: &ToolExecutionId) -> Option<HumanApproval> {
        self.read(|state| state.approvals.get(execution_id.as_str()).cloned())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
