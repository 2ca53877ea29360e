//! 角色分配的 HTTP 处理器

use super::{DataResponse, IncludeDeletedQuery};
use crate::{
    error::AppError,
    middleware::AppState,
    models::role_assignment::{CreateRoleAssignmentRequest, UpdateRoleAssignmentRequest},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

pub async fn create_assignment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoleAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = state.role_assignment_service.create(req).await?;
    Ok(DataResponse::created(assignment))
}

pub async fn list_assignments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IncludeDeletedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let assignments = state
        .role_assignment_service
        .find_all(query.enabled())
        .await?;
    Ok(DataResponse::ok(assignments))
}

pub async fn get_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<IncludeDeletedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = state
        .role_assignment_service
        .find_by_id(id, query.enabled())
        .await?;
    Ok(DataResponse::ok(assignment))
}

pub async fn list_user_assignments(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<IncludeDeletedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let assignments = state
        .role_assignment_service
        .find_by_user_id(user_id, query.enabled())
        .await?;
    Ok(DataResponse::ok(assignments))
}

/// 当前生效的分配
pub async fn list_active_user_assignments(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let assignments = state
        .role_assignment_service
        .find_active_by_user_id(user_id)
        .await?;
    Ok(DataResponse::ok(assignments))
}

pub async fn update_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = state.role_assignment_service.update(id, req).await?;
    Ok(DataResponse::ok(assignment))
}

pub async fn delete_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.role_assignment_service.soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = state.role_assignment_service.restore(id).await?;
    Ok(DataResponse::ok(assignment))
}

pub async fn hard_delete_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.role_assignment_service.hard_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
