//! 角色目录服务

use super::ensure_not_referenced;
use crate::{
    error::{AppError, ConflictReason, Result},
    models::role::{CreateRoleRequest, Role, UpdateRoleRequest},
    repository::{RoleAssignmentStore, RoleStore, Storage},
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const ENTITY: &str = "Role";
const ALREADY_EXISTS: &str = "Role with this name already exists";

pub struct RoleService {
    roles: Arc<dyn RoleStore>,
    assignments: Arc<dyn RoleAssignmentStore>,
}

impl RoleService {
    pub fn new(storage: &Storage) -> Self {
        Self {
            roles: storage.roles.clone(),
            assignments: storage.role_assignments.clone(),
        }
    }

    pub async fn create(&self, req: CreateRoleRequest) -> Result<Role> {
        req.validate()?;

        if self.roles.find_by_name(&req.name, false).await?.is_some() {
            return Err(AppError::AlreadyExists(ALREADY_EXISTS.to_string()));
        }

        let role = self.roles.create(&Role::new(req)).await?;
        tracing::info!(role_id = %role.id, name = %role.name, "Role created");
        Ok(role)
    }

    pub async fn find_all(&self, include_deleted: bool) -> Result<Vec<Role>> {
        self.roles.find_all(include_deleted).await
    }

    pub async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Role> {
        self.roles
            .find_by_id(id, include_deleted)
            .await?
            .ok_or(AppError::not_found(ENTITY))
    }

    pub async fn find_by_name(&self, name: &str, include_deleted: bool) -> Result<Role> {
        self.roles
            .find_by_name(name, include_deleted)
            .await?
            .ok_or(AppError::not_found(ENTITY))
    }

    pub async fn find_active(&self) -> Result<Vec<Role>> {
        self.roles.find_active().await
    }

    pub async fn update(&self, id: Uuid, req: UpdateRoleRequest) -> Result<Role> {
        req.validate()?;
        let mut role = self.find_by_id(id, false).await?;

        if let Some(name) = &req.name {
            self.ensure_name_free(name, id).await?;
        }

        role.apply(req);
        self.roles.update(&role).await
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.find_by_id(id, false).await?;
        ensure_not_referenced(self.assignments.as_ref(), "role", false, |a| a.has_role(id))
            .await?;

        self.roles.soft_delete(id).await?;
        tracing::info!(role_id = %id, "Role soft-deleted");
        Ok(())
    }

    pub async fn restore(&self, id: Uuid) -> Result<Role> {
        let role = self.find_by_id(id, true).await?;
        if !role.is_deleted() {
            return Err(ConflictReason::NotDeleted { entity: ENTITY }.into());
        }
        // 软删除期间可能已有同名角色
        self.ensure_name_free(&role.name, id).await?;

        self.roles.restore(id).await?;
        tracing::info!(role_id = %id, "Role restored");
        self.find_by_id(id, false).await
    }

    pub async fn hard_delete(&self, id: Uuid) -> Result<()> {
        self.find_by_id(id, true).await?;
        ensure_not_referenced(self.assignments.as_ref(), "role", true, |a| a.has_role(id)).await?;

        self.roles.hard_delete(id).await?;
        tracing::info!(role_id = %id, "Role permanently deleted");
        Ok(())
    }

    async fn ensure_name_free(&self, name: &str, id: Uuid) -> Result<()> {
        match self.roles.find_by_name(name, false).await? {
            Some(other) if other.id != id => {
                Err(AppError::AlreadyExists(ALREADY_EXISTS.to_string()))
            }
            _ => Ok(()),
        }
    }
}
