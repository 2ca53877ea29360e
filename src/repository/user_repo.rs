//! User repository (数据库访问层)

use super::UserStore;
use crate::{
    error::{AppError, Result},
    models::user::{User, UserRole},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role: UserRole = row.role.parse().map_err(AppError::Internal)?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

pub struct UserRepository {
    db: PgPool,
}

impl UserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE id = $1 AND ($2 OR deleted_at IS NULL)",
        )
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(&self.db)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_by_email(&self, email: &str, include_deleted: bool) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE email = $1 AND ($2 OR deleted_at IS NULL)",
        )
        .bind(email)
        .bind(include_deleted)
        .fetch_optional(&self.db)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_all(&self, include_deleted: bool, page: u32, per_page: u32) -> Result<Vec<User>> {
        let limit = i64::from(per_page);
        let offset = i64::from(page.saturating_sub(1)) * limit;

        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT * FROM users
            WHERE ($1 OR deleted_at IS NULL)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(include_deleted)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn count(&self, include_deleted: bool) -> Result<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM users WHERE ($1 OR deleted_at IS NULL)")
            .bind(include_deleted)
            .fetch_one(&self.db)
            .await?
            .get(0);

        Ok(count.max(0) as u64)
    }

    async fn update(&self, user: &User) -> Result<User> {
        sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET
                name = $2,
                email = $3,
                password_hash = $4,
                role = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::not_found("User"))?
        .try_into()
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        super::set_deleted_at(&self.db, "users", "User", id, true).await
    }

    async fn restore(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, UserRow>(
            "UPDATE users SET deleted_at = NULL, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::not_found("User"))?
        .try_into()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        super::delete_row(&self.db, "users", "User", id).await
    }
}
