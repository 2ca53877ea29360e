//! Role assignment lifecycle
//!
//! Reference checks are independent reads made before the write, not one
//! transaction: a role deleted between validation and insert is not caught.

use crate::{
    error::{AppError, ConflictReason, NotFound, Result},
    models::role_assignment::{
        ensure_date_range, parse_date, CreateRoleAssignmentRequest, NewRoleAssignment,
        RoleAssignment, UpdateRoleAssignmentRequest,
    },
    repository::{
        EnvironmentPermissionStore, RoleAssignmentStore, RoleStore, Storage, UserStore,
    },
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const ENTITY: &str = "Role assignment";

pub struct RoleAssignmentService {
    assignments: Arc<dyn RoleAssignmentStore>,
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    permissions: Arc<dyn EnvironmentPermissionStore>,
}

impl RoleAssignmentService {
    pub fn new(storage: &Storage) -> Self {
        Self {
            assignments: storage.role_assignments.clone(),
            users: storage.users.clone(),
            roles: storage.roles.clone(),
            permissions: storage.environment_permissions.clone(),
        }
    }

    /// Validates references and the date window, then persists.
    ///
    /// Check order: user, grantor, referenced ids (reported together), dates.
    pub async fn create(&self, req: CreateRoleAssignmentRequest) -> Result<RoleAssignment> {
        req.validate()?;
        let start_date = parse_date("startDate", &req.start_date)?;
        let end_date = req
            .end_date
            .as_deref()
            .map(|raw| parse_date("endDate", raw))
            .transpose()?;

        if self.users.find_by_id(req.user_id, false).await?.is_none() {
            return Err(NotFound::User.into());
        }
        if self.users.find_by_id(req.granted_by, false).await?.is_none() {
            return Err(NotFound::Grantor.into());
        }
        self.ensure_references(&req.roles, &req.access_environments)
            .await?;
        ensure_date_range(start_date, end_date)?;

        let assignment = RoleAssignment::new(NewRoleAssignment {
            user_id: req.user_id,
            roles: req.roles,
            access_environments: req.access_environments,
            start_date,
            end_date,
            state: req.state,
            notes: req.notes,
            granted_by: req.granted_by,
        });
        let assignment = self.assignments.create(&assignment).await?;

        tracing::info!(
            assignment_id = %assignment.id,
            user_id = %assignment.user_id,
            granted_by = %assignment.granted_by,
            roles = assignment.roles.len(),
            environments = assignment.access_environments.len(),
            "Role assignment created"
        );
        Ok(assignment)
    }

    pub async fn find_all(&self, include_deleted: bool) -> Result<Vec<RoleAssignment>> {
        self.assignments.find_all(include_deleted).await
    }

    pub async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<RoleAssignment> {
        self.assignments
            .find_by_id(id, include_deleted)
            .await?
            .ok_or(AppError::not_found(ENTITY))
    }

    pub async fn find_by_user_id(
        &self,
        user_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<RoleAssignment>> {
        self.assignments.find_by_user_id(user_id, include_deleted).await
    }

    pub async fn find_by_granted_by(
        &self,
        granted_by: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<RoleAssignment>> {
        self.assignments
            .find_by_granted_by(granted_by, include_deleted)
            .await
    }

    pub async fn find_active_by_user_id(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>> {
        self.find_active_by_user_id_at(user_id, Utc::now()).await
    }

    pub async fn find_active_by_user_id_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RoleAssignment>> {
        self.assignments.find_active_by_user_id(user_id, now).await
    }

    /// Merges `req` into the live assignment.
    ///
    /// Id lists are re-validated only when supplied; the window is checked
    /// with supplied dates merged over the stored ones.
    pub async fn update(
        &self,
        id: Uuid,
        req: UpdateRoleAssignmentRequest,
    ) -> Result<RoleAssignment> {
        req.validate()?;
        let start_date = req
            .start_date
            .as_deref()
            .map(|raw| parse_date("startDate", raw))
            .transpose()?;
        let end_date = req
            .end_date
            .as_deref()
            .map(|raw| parse_date("endDate", raw))
            .transpose()?;

        let mut assignment = self.find_by_id(id, false).await?;

        self.ensure_references(
            req.roles.as_deref().unwrap_or_default(),
            req.access_environments.as_deref().unwrap_or_default(),
        )
        .await?;

        let start_date = start_date.unwrap_or(assignment.start_date);
        let end_date = end_date.or(assignment.end_date);
        ensure_date_range(start_date, end_date)?;

        if let Some(roles) = req.roles {
            assignment.roles = roles;
        }
        if let Some(environments) = req.access_environments {
            assignment.access_environments = environments;
        }
        if let Some(state) = req.state {
            assignment.state = state;
        }
        if let Some(notes) = req.notes {
            assignment.notes = notes;
        }
        assignment.start_date = start_date;
        assignment.end_date = end_date;
        assignment.updated_at = Utc::now();

        self.assignments.update(&assignment).await
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.find_by_id(id, false).await?;
        self.assignments.soft_delete(id).await?;
        tracing::info!(assignment_id = %id, "Role assignment soft-deleted");
        Ok(())
    }

    pub async fn restore(&self, id: Uuid) -> Result<RoleAssignment> {
        let assignment = self.find_by_id(id, true).await?;
        if !assignment.is_deleted() {
            return Err(ConflictReason::NotDeleted { entity: ENTITY }.into());
        }

        self.assignments.restore(id).await?;
        tracing::info!(assignment_id = %id, "Role assignment restored");
        self.find_by_id(id, false).await
    }

    pub async fn hard_delete(&self, id: Uuid) -> Result<()> {
        self.find_by_id(id, true).await?;
        self.assignments.hard_delete(id).await?;
        tracing::info!(assignment_id = %id, "Role assignment permanently deleted");
        Ok(())
    }

    /// Every id must resolve through a default (non-deleted) read.
    async fn ensure_references(&self, role_ids: &[Uuid], environment_ids: &[Uuid]) -> Result<()> {
        let mut missing_roles = Vec::new();
        for id in role_ids {
            if !missing_roles.contains(id) && self.roles.find_by_id(*id, false).await?.is_none() {
                missing_roles.push(*id);
            }
        }

        let mut missing_environments = Vec::new();
        for id in environment_ids {
            if !missing_environments.contains(id)
                && self.permissions.find_by_id(*id, false).await?.is_none()
            {
                missing_environments.push(*id);
            }
        }

        if missing_roles.is_empty() && missing_environments.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            roles = ?missing_roles,
            environments = ?missing_environments,
            "Role assignment references unknown ids"
        );
        Err(NotFound::References {
            role_ids: missing_roles,
            environment_ids: missing_environments,
        }
        .into())
    }
}
