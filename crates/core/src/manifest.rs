// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent manifests: static descriptors of what an agent is allowed to do.
//!
//! A manifest is the contract between an agent implementation and the
//! orchestrator: which events it consumes, which it may emit, whether it
//! may write the user's shared context, and which tools it may request.

use crate::json::JsonMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Opaque, externally-assigned agent identifier (e.g. `"health_goal"`).
///
/// Distinct from [`crate::InstallationId`]: an agent id names a catalog
/// entry, an installation id names one user's binding to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Create a new AgentId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value of this AgentId.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for AgentId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AgentId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Catalog key: one manifest per `(agent_id, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestKey {
    pub agent_id: AgentId,
    pub version: String,
}

impl ManifestKey {
    pub fn new(agent_id: impl Into<AgentId>, version: impl Into<String>) -> Self {
        Self { agent_id: agent_id.into(), version: version.into() }
    }
}

impl fmt::Display for ManifestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.agent_id, self.version)
    }
}

/// Lifecycle status of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Active,
    Deprecated,
    Archived,
}

crate::simple_display! {
    ManifestStatus {
        Active => "active",
        Deprecated => "deprecated",
        Archived => "archived",
    }
}

/// Context access grants declared by a manifest.
///
/// Agent memory is always readable and writable by its owner; these
/// flags only govern the user's shared context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub read_shared_context: bool,
    #[serde(default)]
    pub write_shared_context: bool,
}

/// Static descriptor of an agent, keyed by `(agent_id, version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentManifest {
    pub agent_id: AgentId,
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Declared onboarding inputs schema (opaque to the core).
    #[serde(default)]
    pub inputs: JsonMap,
    /// Event types this agent is dispatched for.
    #[serde(default)]
    pub subscribed_events: BTreeSet<String>,
    /// Event types this agent declares it may emit (informational).
    #[serde(default)]
    pub emitted_events: BTreeSet<String>,
    #[serde(default)]
    pub permissions: Permissions,
    /// Tool ids this agent may request.
    #[serde(default)]
    pub tools: BTreeSet<String>,
    pub status: ManifestStatus,
}

impl AgentManifest {
    pub fn key(&self) -> ManifestKey {
        ManifestKey { agent_id: self.agent_id.clone(), version: self.version.clone() }
    }

    pub fn is_active(&self) -> bool {
        self.status == ManifestStatus::Active
    }

    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.subscribed_events.contains(event_type)
    }
}

crate::builder! {
    pub struct AgentManifestBuilder => AgentManifest {
        into {
            agent_id: AgentId = "test_agent",
            version: String = "1.0.0",
            name: String = "Test Agent",
            description: String = "",
        }
        set {
            subscribed_events: BTreeSet<String> = BTreeSet::new(),
            emitted_events: BTreeSet<String> = BTreeSet::new(),
            permissions: Permissions = Permissions::default(),
            tools: BTreeSet<String> = BTreeSet::new(),
            status: ManifestStatus = ManifestStatus::Active,
        }
        computed {
            inputs: JsonMap = JsonMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
