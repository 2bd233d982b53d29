// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent installations: a user's binding to a specific agent version.

use crate::manifest::AgentId;
use crate::user::UserId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an agent installation.
    ///
    /// At most one installation exists per `(user, agent_id, version)`,
    /// regardless of status history.
    pub struct InstallationId("ins-");
}

/// Lifecycle status of an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationStatus {
    Installed,
    Active,
    Paused,
    Uninstalled,
}

crate::simple_display! {
    InstallationStatus {
        Installed => "installed",
        Active => "active",
        Paused => "paused",
        Uninstalled => "uninstalled",
    }
}

impl InstallationStatus {
    /// Only active installations participate in event dispatch.
    pub fn is_active(&self) -> bool {
        matches!(self, InstallationStatus::Active)
    }
}

/// A user's binding to a specific `(agent_id, version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInstallation {
    pub id: InstallationId,
    pub user_id: UserId,
    pub agent_id: AgentId,
    pub version: String,
    pub status: InstallationStatus,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl AgentInstallation {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn manifest_key(&self) -> crate::manifest::ManifestKey {
        crate::manifest::ManifestKey {
            agent_id: self.agent_id.clone(),
            version: self.version.clone(),
        }
    }
}

crate::builder! {
    pub struct AgentInstallationBuilder => AgentInstallation {
        into {
            user_id: UserId = "user-1",
            agent_id: AgentId = "test_agent",
            version: String = "1.0.0",
        }
        set {
            status: InstallationStatus = InstallationStatus::Active,
            created_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
        }
        computed {
            id: InstallationId = InstallationId::new(),
        }
    }
}

#[cfg(test)]
#[path = "installation_tests.rs"]
mod tests;
