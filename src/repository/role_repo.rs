//! Role repository (角色数据访问)

use super::{delete_row, set_deleted_at, RoleStore};
use crate::{error::AppError, error::Result, models::role::Role};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct RoleRepository {
    db: PgPool,
}

impl RoleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleStore for RoleRepository {
    async fn create(&self, role: &Role) -> Result<Role> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (id, name, description, access_areas, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(&role.access_areas)
        .bind(role.active)
        .bind(role.created_at)
        .bind(role.updated_at)
        .fetch_one(&self.db)
        .await?;

        Ok(role)
    }

    async fn find_all(&self, include_deleted: bool) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT * FROM roles WHERE ($1 OR deleted_at IS NULL) ORDER BY created_at",
        )
        .bind(include_deleted)
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT * FROM roles WHERE id = $1 AND ($2 OR deleted_at IS NULL)",
        )
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    async fn find_by_name(&self, name: &str, include_deleted: bool) -> Result<Option<Role>> {
        // 名称唯一性以未删除的行为准，软删除后可能存在同名行
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE name = $1 AND ($2 OR deleted_at IS NULL)
            ORDER BY deleted_at NULLS FIRST
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(include_deleted)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    async fn find_active(&self) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT * FROM roles WHERE active AND deleted_at IS NULL ORDER BY created_at",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    async fn update(&self, role: &Role) -> Result<Role> {
        sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET
                name = $2,
                description = $3,
                access_areas = $4,
                active = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(&role.access_areas)
        .bind(role.active)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::not_found("Role"))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        set_deleted_at(&self.db, "roles", "Role", id, true).await
    }

    async fn restore(&self, id: Uuid) -> Result<()> {
        set_deleted_at(&self.db, "roles", "Role", id, false).await
    }

    async fn hard_delete(&self, id: Uuid) -> Result<()> {
        delete_row(&self.db, "roles", "Role", id).await
    }
}
