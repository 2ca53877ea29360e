//! Environment permission repository

use super::{delete_row, set_deleted_at, EnvironmentPermissionStore};
use crate::{
    error::{AppError, Result},
    models::environment_permission::{EnvironmentPermission, PermittedAction},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const ENTITY: &str = "Environment permission";

#[derive(Debug, FromRow)]
struct EnvironmentPermissionRow {
    id: Uuid,
    name: String,
    permitted_actions: Vec<String>,
    profile: String,
    purpose: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<EnvironmentPermissionRow> for EnvironmentPermission {
    type Error = AppError;

    fn try_from(row: EnvironmentPermissionRow) -> Result<Self> {
        let permitted_actions = row
            .permitted_actions
            .iter()
            .map(|a| a.parse::<PermittedAction>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AppError::Internal)?;

        Ok(EnvironmentPermission {
            id: row.id,
            name: row.name,
            permitted_actions,
            profile: row.profile,
            purpose: row.purpose,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

fn action_names(permission: &EnvironmentPermission) -> Vec<String> {
    permission
        .permitted_actions
        .iter()
        .map(|a| a.as_str().to_string())
        .collect()
}

fn convert(rows: Vec<EnvironmentPermissionRow>) -> Result<Vec<EnvironmentPermission>> {
    rows.into_iter().map(EnvironmentPermission::try_from).collect()
}

pub struct EnvironmentPermissionRepository {
    db: PgPool,
}

impl EnvironmentPermissionRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EnvironmentPermissionStore for EnvironmentPermissionRepository {
    async fn create(&self, permission: &EnvironmentPermission) -> Result<EnvironmentPermission> {
        sqlx::query_as::<_, EnvironmentPermissionRow>(
            r#"
            INSERT INTO environment_permissions
                (id, name, permitted_actions, profile, purpose, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(permission.id)
        .bind(&permission.name)
        .bind(action_names(permission))
        .bind(&permission.profile)
        .bind(&permission.purpose)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .fetch_one(&self.db)
        .await?
        .try_into()
    }

    async fn find_all(&self, include_deleted: bool) -> Result<Vec<EnvironmentPermission>> {
        let rows = sqlx::query_as::<_, EnvironmentPermissionRow>(
            r#"
            SELECT * FROM environment_permissions
            WHERE ($1 OR deleted_at IS NULL)
            ORDER BY created_at
            "#,
        )
        .bind(include_deleted)
        .fetch_all(&self.db)
        .await?;

        convert(rows)
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> Result<Option<EnvironmentPermission>> {
        sqlx::query_as::<_, EnvironmentPermissionRow>(
            "SELECT * FROM environment_permissions WHERE id = $1 AND ($2 OR deleted_at IS NULL)",
        )
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(&self.db)
        .await?
        .map(EnvironmentPermission::try_from)
        .transpose()
    }

    async fn find_by_name(
        &self,
        name: &str,
        include_deleted: bool,
    ) -> Result<Option<EnvironmentPermission>> {
        sqlx::query_as::<_, EnvironmentPermissionRow>(
            r#"
            SELECT * FROM environment_permissions
            WHERE name = $1 AND ($2 OR deleted_at IS NULL)
            ORDER BY deleted_at NULLS FIRST
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(include_deleted)
        .fetch_optional(&self.db)
        .await?
        .map(EnvironmentPermission::try_from)
        .transpose()
    }

    async fn find_by_profile(
        &self,
        profile: &str,
        include_deleted: bool,
    ) -> Result<Vec<EnvironmentPermission>> {
        let rows = sqlx::query_as::<_, EnvironmentPermissionRow>(
            r#"
            SELECT * FROM environment_permissions
            WHERE profile = $1 AND ($2 OR deleted_at IS NULL)
            ORDER BY created_at
            "#,
        )
        .bind(profile)
        .bind(include_deleted)
        .fetch_all(&self.db)
        .await?;

        convert(rows)
    }

    async fn update(&self, permission: &EnvironmentPermission) -> Result<EnvironmentPermission> {
        sqlx::query_as::<_, EnvironmentPermissionRow>(
            r#"
            UPDATE environment_permissions
            SET
                name = $2,
                permitted_actions = $3,
                profile = $4,
                purpose = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(permission.id)
        .bind(&permission.name)
        .bind(action_names(permission))
        .bind(&permission.profile)
        .bind(&permission.purpose)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::not_found(ENTITY))?
        .try_into()
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        set_deleted_at(&self.db, "environment_permissions", ENTITY, id, true).await
    }

    async fn restore(&self, id: Uuid) -> Result<()> {
        set_deleted_at(&self.db, "environment_permissions", ENTITY, id, false).await
    }

    async fn hard_delete(&self, id: Uuid) -> Result<()> {
        delete_row(&self.db, "environment_permissions", ENTITY, id).await
    }
}
