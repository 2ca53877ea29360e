//! Role domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub access_areas: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Role {
    pub fn new(req: CreateRoleRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            access_areas: dedup(req.access_areas),
            active: req.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Merge the fields present in `req`; absent fields keep their value.
    pub fn apply(&mut self, req: UpdateRoleRequest) {
        if let Some(name) = req.name {
            self.name = name;
        }
        if let Some(description) = req.description {
            self.description = description;
        }
        if let Some(access_areas) = req.access_areas {
            self.access_areas = dedup(access_areas);
        }
        if let Some(active) = req.active {
            self.active = active;
        }
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        self.active && self.deleted_at.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn has_access_to_area(&self, area: &str) -> bool {
        self.access_areas.iter().any(|a| a == area)
    }

    pub fn has_any_access_area(&self, areas: &[&str]) -> bool {
        areas.iter().any(|area| self.has_access_to_area(area))
    }
}

/// Keeps first occurrence order.
pub(crate) fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Create role request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(length(min = 10, max = 500))]
    pub description: String,
    #[serde(default)]
    pub access_areas: Vec<String>,
    pub active: Option<bool>,
}

/// Update role request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 10, max = 500))]
    pub description: Option<String>,
    pub access_areas: Option<Vec<String>>,
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reviewer() -> Role {
        Role::new(CreateRoleRequest {
            name: "Reviewer".to_string(),
            description: "Reviews merge requests".to_string(),
            access_areas: vec!["code".to_string(), "docs".to_string(), "code".to_string()],
            active: None,
        })
    }

    #[test]
    fn test_new_role_defaults() {
        let role = reviewer();
        assert!(role.active);
        assert!(role.is_active());
        assert_eq!(role.access_areas, vec!["code", "docs"]);
        assert_eq!(role.created_at, role.updated_at);
    }

    #[test]
    fn test_apply_leaves_absent_fields() {
        let mut role = reviewer();
        let before = role.clone();

        role.apply(UpdateRoleRequest {
            active: Some(false),
            ..Default::default()
        });

        assert_eq!(role.name, before.name);
        assert_eq!(role.description, before.description);
        assert_eq!(role.access_areas, before.access_areas);
        assert!(!role.active);
        assert!(!role.is_active());
    }

    #[test]
    fn test_access_area_checks() {
        let role = reviewer();
        assert!(role.has_access_to_area("docs"));
        assert!(!role.has_access_to_area("billing"));
        assert!(role.has_any_access_area(&["billing", "code"]));
    }
}
