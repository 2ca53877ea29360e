//! Business logic services layer

pub mod auth_service;
pub mod environment_permission_service;
pub mod role_assignment_service;
pub mod role_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use environment_permission_service::EnvironmentPermissionService;
pub use role_assignment_service::RoleAssignmentService;
pub use role_service::RoleService;
pub use user_service::UserService;

use crate::{
    error::{ConflictReason, Result},
    models::RoleAssignment,
    repository::RoleAssignmentStore,
};

/// In-use check shared by the catalog services.
///
/// Linear scan over assignments; soft deletes scan live rows only, hard
/// deletes pass `include_deleted = true`.
async fn ensure_not_referenced<F>(
    assignments: &dyn RoleAssignmentStore,
    entity: &'static str,
    include_deleted: bool,
    references: F,
) -> Result<()>
where
    F: Fn(&RoleAssignment) -> bool,
{
    let count = assignments
        .find_all(include_deleted)
        .await?
        .iter()
        .filter(|a| references(a))
        .count();

    if count > 0 {
        tracing::warn!(entity, count, include_deleted, "Delete blocked by role assignments");
        return Err(ConflictReason::InUse { entity, count }.into());
    }
    Ok(())
}
