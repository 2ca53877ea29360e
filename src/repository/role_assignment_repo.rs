//! Role assignment repository

use super::{delete_row, set_deleted_at, RoleAssignmentStore};
use crate::{
    error::{AppError, Result},
    models::role_assignment::{AssignmentState, RoleAssignment},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const ENTITY: &str = "Role assignment";

#[derive(Debug, FromRow)]
struct RoleAssignmentRow {
    id: Uuid,
    user_id: Uuid,
    roles: Vec<Uuid>,
    access_environments: Vec<Uuid>,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    state: String,
    notes: String,
    granted_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<RoleAssignmentRow> for RoleAssignment {
    type Error = AppError;

    fn try_from(row: RoleAssignmentRow) -> Result<Self> {
        let state: AssignmentState = row.state.parse().map_err(AppError::Internal)?;
        Ok(RoleAssignment {
            id: row.id,
            user_id: row.user_id,
            roles: row.roles,
            access_environments: row.access_environments,
            start_date: row.start_date,
            end_date: row.end_date,
            state,
            notes: row.notes,
            granted_by: row.granted_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

fn convert(rows: Vec<RoleAssignmentRow>) -> Result<Vec<RoleAssignment>> {
    rows.into_iter().map(RoleAssignment::try_from).collect()
}

pub struct RoleAssignmentRepository {
    db: PgPool,
}

impl RoleAssignmentRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_by_column(
        &self,
        column: &'static str,
        value: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<RoleAssignment>> {
        let sql = format!(
            "SELECT * FROM role_assignments WHERE {column} = $1 AND ($2 OR deleted_at IS NULL) ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, RoleAssignmentRow>(&sql)
            .bind(value)
            .bind(include_deleted)
            .fetch_all(&self.db)
            .await?;

        convert(rows)
    }
}

#[async_trait]
impl RoleAssignmentStore for RoleAssignmentRepository {
    async fn create(&self, assignment: &RoleAssignment) -> Result<RoleAssignment> {
        sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            INSERT INTO role_assignments
                (id, user_id, roles, access_environments, start_date, end_date,
                 state, notes, granted_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.user_id)
        .bind(&assignment.roles)
        .bind(&assignment.access_environments)
        .bind(assignment.start_date)
        .bind(assignment.end_date)
        .bind(assignment.state.as_str())
        .bind(&assignment.notes)
        .bind(assignment.granted_by)
        .bind(assignment.created_at)
        .bind(assignment.updated_at)
        .fetch_one(&self.db)
        .await?
        .try_into()
    }

    async fn find_all(&self, include_deleted: bool) -> Result<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, RoleAssignmentRow>(
            "SELECT * FROM role_assignments WHERE ($1 OR deleted_at IS NULL) ORDER BY created_at",
        )
        .bind(include_deleted)
        .fetch_all(&self.db)
        .await?;

        convert(rows)
    }

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<RoleAssignment>> {
        sqlx::query_as::<_, RoleAssignmentRow>(
            "SELECT * FROM role_assignments WHERE id = $1 AND ($2 OR deleted_at IS NULL)",
        )
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(&self.db)
        .await?
        .map(RoleAssignment::try_from)
        .transpose()
    }

    async fn find_by_user_id(
        &self,
        user_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<RoleAssignment>> {
        self.find_by_column("user_id", user_id, include_deleted).await
    }

    async fn find_by_granted_by(
        &self,
        granted_by: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<RoleAssignment>> {
        self.find_by_column("granted_by", granted_by, include_deleted)
            .await
    }

    async fn update(&self, assignment: &RoleAssignment) -> Result<RoleAssignment> {
        sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            UPDATE role_assignments
            SET
                roles = $2,
                access_environments = $3,
                start_date = $4,
                end_date = $5,
                state = $6,
                notes = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(assignment.id)
        .bind(&assignment.roles)
        .bind(&assignment.access_environments)
        .bind(assignment.start_date)
        .bind(assignment.end_date)
        .bind(assignment.state.as_str())
        .bind(&assignment.notes)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::not_found(ENTITY))?
        .try_into()
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        set_deleted_at(&self.db, "role_assignments", ENTITY, id, true).await
    }

    async fn restore(&self, id: Uuid) -> Result<()> {
        set_deleted_at(&self.db, "role_assignments", ENTITY, id, false).await
    }

    async fn hard_delete(&self, id: Uuid) -> Result<()> {
        delete_row(&self.db, "role_assignments", ENTITY, id).await
    }
}
