//! Role assignment domain models
//!
//! An assignment grants a user a list of roles and environment permissions for a
//! date window. Whether it currently grants anything is derived from the stored
//! state, the window and the soft-delete stamp; see [`RoleAssignment::is_active_at`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssignmentState {
    #[default]
    Active,
    Inactive,
    Suspended,
    Expired,
}

impl AssignmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentState::Active => "ACTIVE",
            AssignmentState::Inactive => "INACTIVE",
            AssignmentState::Suspended => "SUSPENDED",
            AssignmentState::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(AssignmentState::Active),
            "INACTIVE" => Ok(AssignmentState::Inactive),
            "SUSPENDED" => Ok(AssignmentState::Suspended),
            "EXPIRED" => Ok(AssignmentState::Expired),
            other => Err(format!("Invalid assignment state: {other}")),
        }
    }
}

/// Role assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Role ids, in the order they were granted
    pub roles: Vec<Uuid>,
    /// Environment permission ids, in the order they were granted
    pub access_environments: Vec<Uuid>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub state: AssignmentState,
    pub notes: String,
    pub granted_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Validated input for [`RoleAssignment::new`].
#[derive(Debug, Clone)]
pub struct NewRoleAssignment {
    pub user_id: Uuid,
    pub roles: Vec<Uuid>,
    pub access_environments: Vec<Uuid>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub state: Option<AssignmentState>,
    pub notes: Option<String>,
    pub granted_by: Uuid,
}

impl RoleAssignment {
    pub fn new(spec: NewRoleAssignment) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: spec.user_id,
            roles: spec.roles,
            access_environments: spec.access_environments,
            start_date: spec.start_date,
            end_date: spec.end_date,
            state: spec.state.unwrap_or_default(),
            notes: spec.notes.unwrap_or_default(),
            granted_by: spec.granted_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether this assignment grants access at `now`.
    ///
    /// Both window bounds are inclusive. This is the only place the rule is
    /// evaluated; stores and services filter through it.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state == AssignmentState::Active
            && self.start_date <= now
            && self.end_date.map_or(true, |end| end >= now)
            && self.deleted_at.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn has_role(&self, role_id: Uuid) -> bool {
        self.roles.contains(&role_id)
    }

    pub fn has_environment_access(&self, permission_id: Uuid) -> bool {
        self.access_environments.contains(&permission_id)
    }
}

/// Checks `end > start` when an end is present.
pub fn ensure_date_range(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    match end {
        Some(end) if end <= start => Err(AppError::InvalidDateRange),
        _ => Ok(()),
    }
}

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(field: &str, raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(ts.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return Ok(ts.and_utc());
        }
    }

    Err(AppError::Validation(format!(
        "{field} must be an ISO 8601 date, got '{raw}'"
    )))
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleAssignmentRequest {
    pub user_id: Uuid,
    pub roles: Vec<Uuid>,
    pub access_environments: Vec<Uuid>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub state: Option<AssignmentState>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub granted_by: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleAssignmentRequest {
    pub roles: Option<Vec<Uuid>>,
    pub access_environments: Option<Vec<Uuid>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub state: Option<AssignmentState>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}
