//! Environment permission domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use validator::Validate;

use super::role::dedup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermittedAction {
    Read,
    Write,
    Delete,
    Execute,
}

impl PermittedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermittedAction::Read => "READ",
            PermittedAction::Write => "WRITE",
            PermittedAction::Delete => "DELETE",
            PermittedAction::Execute => "EXECUTE",
        }
    }
}

impl fmt::Display for PermittedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermittedAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READ" => Ok(PermittedAction::Read),
            "WRITE" => Ok(PermittedAction::Write),
            "DELETE" => Ok(PermittedAction::Delete),
            "EXECUTE" => Ok(PermittedAction::Execute),
            other => Err(format!("Invalid permitted action: {other}")),
        }
    }
}

/// Environment permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentPermission {
    pub id: Uuid,
    pub name: String,
    pub permitted_actions: Vec<PermittedAction>,
    pub profile: String,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EnvironmentPermission {
    pub fn new(req: CreateEnvironmentPermissionRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: req.name,
            permitted_actions: dedup(req.permitted_actions),
            profile: req.profile,
            purpose: req.purpose,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Merge the fields present in `req`; absent fields keep their value.
    pub fn apply(&mut self, req: UpdateEnvironmentPermissionRequest) {
        if let Some(name) = req.name {
            self.name = name;
        }
        if let Some(actions) = req.permitted_actions {
            self.permitted_actions = dedup(actions);
        }
        if let Some(profile) = req.profile {
            self.profile = profile;
        }
        if let Some(purpose) = req.purpose {
            self.purpose = purpose;
        }
        self.updated_at = Utc::now();
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn can_perform(&self, action: PermittedAction) -> bool {
        self.permitted_actions.contains(&action)
    }

    pub fn has_all_actions(&self, actions: &[PermittedAction]) -> bool {
        actions.iter().all(|a| self.can_perform(*a))
    }

    pub fn has_any_action(&self, actions: &[PermittedAction]) -> bool {
        actions.iter().any(|a| self.can_perform(*a))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnvironmentPermissionRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    pub permitted_actions: Vec<PermittedAction>,
    #[validate(length(min = 2, max = 100))]
    pub profile: String,
    #[validate(length(min = 10, max = 500))]
    pub purpose: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnvironmentPermissionRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    pub permitted_actions: Option<Vec<PermittedAction>>,
    #[validate(length(min = 2, max = 100))]
    pub profile: Option<String>,
    #[validate(length(min = 10, max = 500))]
    pub purpose: Option<String>,
}
