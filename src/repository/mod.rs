//! Database repository layer
//!
//! Services talk to storage through the store traits below. Every read that can
//! see soft-deleted rows takes an explicit `include_deleted` flag; with `false`
//! rows whose `deleted_at` is set are invisible.

pub mod environment_permission_repo;
pub mod memory;
pub mod role_assignment_repo;
pub mod role_repo;
pub mod user_repo;

pub use environment_permission_repo::EnvironmentPermissionRepository;
pub use memory::InMemoryStore;
pub use role_assignment_repo::RoleAssignmentRepository;
pub use role_repo::RoleRepository;
pub use user_repo::UserRepository;

use crate::{
    error::Result,
    models::{EnvironmentPermission, Role, RoleAssignment, User},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &User) -> Result<User>;
    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str, include_deleted: bool) -> Result<Option<User>>;
    /// Newest first; `page` starts at 1.
    async fn find_all(&self, include_deleted: bool, page: u32, per_page: u32) -> Result<Vec<User>>;
    async fn count(&self, include_deleted: bool) -> Result<u64>;
    async fn update(&self, user: &User) -> Result<User>;
    async fn soft_delete(&self, id: Uuid) -> Result<()>;
    async fn restore(&self, id: Uuid) -> Result<User>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn create(&self, role: &Role) -> Result<Role>;
    async fn find_all(&self, include_deleted: bool) -> Result<Vec<Role>>;
    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<Role>>;
    async fn find_by_name(&self, name: &str, include_deleted: bool) -> Result<Option<Role>>;
    /// `active` and not deleted.
    async fn find_active(&self) -> Result<Vec<Role>>;
    async fn update(&self, role: &Role) -> Result<Role>;
    async fn soft_delete(&self, id: Uuid) -> Result<()>;
    async fn restore(&self, id: Uuid) -> Result<()>;
    async fn hard_delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait EnvironmentPermissionStore: Send + Sync {
    async fn create(&self, permission: &EnvironmentPermission) -> Result<EnvironmentPermission>;
    async fn find_all(&self, include_deleted: bool) -> Result<Vec<EnvironmentPermission>>;
    async fn find_by_id(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> Result<Option<EnvironmentPermission>>;
    async fn find_by_name(
        &self,
        name: &str,
        include_deleted: bool,
    ) -> Result<Option<EnvironmentPermission>>;
    async fn find_by_profile(
        &self,
        profile: &str,
        include_deleted: bool,
    ) -> Result<Vec<EnvironmentPermission>>;
    async fn update(&self, permission: &EnvironmentPermission) -> Result<EnvironmentPermission>;
    async fn soft_delete(&self, id: Uuid) -> Result<()>;
    async fn restore(&self, id: Uuid) -> Result<()>;
    async fn hard_delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait RoleAssignmentStore: Send + Sync {
    async fn create(&self, assignment: &RoleAssignment) -> Result<RoleAssignment>;
    async fn find_all(&self, include_deleted: bool) -> Result<Vec<RoleAssignment>>;
    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<RoleAssignment>>;
    async fn find_by_user_id(
        &self,
        user_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<RoleAssignment>>;
    async fn find_by_granted_by(
        &self,
        granted_by: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<RoleAssignment>>;
    async fn update(&self, assignment: &RoleAssignment) -> Result<RoleAssignment>;
    async fn soft_delete(&self, id: Uuid) -> Result<()>;
    async fn restore(&self, id: Uuid) -> Result<()>;
    async fn hard_delete(&self, id: Uuid) -> Result<()>;

    /// Assignments of `user_id` that grant access at `now`.
    ///
    /// Filters one snapshot of the user's live assignments through
    /// [`RoleAssignment::is_active_at`] rather than re-stating the rule in SQL.
    async fn find_active_by_user_id(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RoleAssignment>> {
        Ok(self
            .find_by_user_id(user_id, false)
            .await?
            .into_iter()
            .filter(|a| a.is_active_at(now))
            .collect())
    }
}

/// Sets or clears `deleted_at` on one row of `table`.
async fn set_deleted_at(
    db: &PgPool,
    table: &'static str,
    entity: &'static str,
    id: Uuid,
    deleted: bool,
) -> Result<()> {
    let stamp = if deleted { "NOW()" } else { "NULL" };
    let sql = format!("UPDATE {table} SET deleted_at = {stamp}, updated_at = NOW() WHERE id = $1");
    let result = sqlx::query(&sql).bind(id).execute(db).await?;

    if result.rows_affected() == 0 {
        return Err(crate::error::AppError::not_found(entity));
    }
    Ok(())
}

async fn delete_row(db: &PgPool, table: &'static str, entity: &'static str, id: Uuid) -> Result<()> {
    let sql = format!("DELETE FROM {table} WHERE id = $1");
    let result = sqlx::query(&sql).bind(id).execute(db).await?;

    if result.rows_affected() == 0 {
        return Err(crate::error::AppError::not_found(entity));
    }
    Ok(())
}

/// The four stores handed to services.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    pub environment_permissions: Arc<dyn EnvironmentPermissionStore>,
    pub role_assignments: Arc<dyn RoleAssignmentStore>,
}

impl Storage {
    pub fn postgres(db: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(db.clone())),
            roles: Arc::new(RoleRepository::new(db.clone())),
            environment_permissions: Arc::new(EnvironmentPermissionRepository::new(db.clone())),
            role_assignments: Arc::new(RoleAssignmentRepository::new(db)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            roles: store.clone(),
            environment_permissions: store.clone(),
            role_assignments: store,
        }
    }
}
