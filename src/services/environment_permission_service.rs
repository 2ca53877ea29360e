//! Environment permission catalog

use super::ensure_not_referenced;
use crate::{
    error::{AppError, ConflictReason, Result},
    models::environment_permission::{
        CreateEnvironmentPermissionRequest, EnvironmentPermission,
        UpdateEnvironmentPermissionRequest,
    },
    repository::{EnvironmentPermissionStore, RoleAssignmentStore, Storage},
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const ENTITY: &str = "Environment permission";
const ALREADY_EXISTS: &str = "Environment permission with this name already exists";

pub struct EnvironmentPermissionService {
    permissions: Arc<dyn EnvironmentPermissionStore>,
    assignments: Arc<dyn RoleAssignmentStore>,
}

impl EnvironmentPermissionService {
    pub fn new(storage: &Storage) -> Self {
        Self {
            permissions: storage.environment_permissions.clone(),
            assignments: storage.role_assignments.clone(),
        }
    }

    pub async fn create(
        &self,
        req: CreateEnvironmentPermissionRequest,
    ) -> Result<EnvironmentPermission> {
        req.validate()?;

        if self.permissions.find_by_name(&req.name, false).await?.is_some() {
            return Err(AppError::AlreadyExists(ALREADY_EXISTS.to_string()));
        }

        let permission = self
            .permissions
            .create(&EnvironmentPermission::new(req))
            .await?;
        tracing::info!(
            permission_id = %permission.id,
            name = %permission.name,
            profile = %permission.profile,
            "Environment permission created"
        );
        Ok(permission)
    }

    pub async fn find_all(&self, include_deleted: bool) -> Result<Vec<EnvironmentPermission>> {
        self.permissions.find_all(include_deleted).await
    }

    pub async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<EnvironmentPermission> {
        self.permissions
            .find_by_id(id, include_deleted)
            .await?
            .ok_or(AppError::not_found(ENTITY))
    }

    pub async fn find_by_name(
        &self,
        name: &str,
        include_deleted: bool,
    ) -> Result<EnvironmentPermission> {
        self.permissions
            .find_by_name(name, include_deleted)
            .await?
            .ok_or(AppError::not_found(ENTITY))
    }

    pub async fn find_by_profile(
        &self,
        profile: &str,
        include_deleted: bool,
    ) -> Result<Vec<EnvironmentPermission>> {
        self.permissions.find_by_profile(profile, include_deleted).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        req: UpdateEnvironmentPermissionRequest,
    ) -> Result<EnvironmentPermission> {
        req.validate()?;
        let mut permission = self.find_by_id(id, false).await?;

        if let Some(name) = &req.name {
            self.ensure_name_free(name, id).await?;
        }

        permission.apply(req);
        self.permissions.update(&permission).await
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.find_by_id(id, false).await?;
        ensure_not_referenced(
            self.assignments.as_ref(),
            "environment permission",
            false,
            |a| a.has_environment_access(id),
        )
        .await?;

        self.permissions.soft_delete(id).await?;
        tracing::info!(permission_id = %id, "Environment permission soft-deleted");
        Ok(())
    }

    pub async fn restore(&self, id: Uuid) -> Result<EnvironmentPermission> {
        let permission = self.find_by_id(id, true).await?;
        if !permission.is_deleted() {
            return Err(ConflictReason::NotDeleted { entity: ENTITY }.into());
        }
        self.ensure_name_free(&permission.name, id).await?;

        self.permissions.restore(id).await?;
        tracing::info!(permission_id = %id, "Environment permission restored");
        self.find_by_id(id, false).await
    }

    pub async fn hard_delete(&self, id: Uuid) -> Result<()> {
        self.find_by_id(id, true).await?;
        ensure_not_referenced(
            self.assignments.as_ref(),
            "environment permission",
            true,
            |a| a.has_environment_access(id),
        )
        .await?;

        self.permissions.hard_delete(id).await?;
        tracing::info!(permission_id = %id, "Environment permission permanently deleted");
        Ok(())
    }

    async fn ensure_name_free(&self, name: &str, id: Uuid) -> Result<()> {
        match self.permissions.find_by_name(name, false).await? {
            Some(other) if other.id != id => {
                Err(AppError::AlreadyExists(ALREADY_EXISTS.to_string()))
            }
            _ => Ok(()),
        }
    }
}
