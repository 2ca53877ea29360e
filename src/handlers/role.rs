//! 角色目录的 HTTP 处理器

use super::{DataResponse, IncludeDeletedQuery};
use crate::{
    error::AppError,
    middleware::AppState,
    models::role::{CreateRoleRequest, UpdateRoleRequest},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

pub async fn create_role(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.role_service.create(req).await?;
    Ok(DataResponse::created(role))
}

pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IncludeDeletedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let roles = state.role_service.find_all(query.enabled()).await?;
    Ok(DataResponse::ok(roles))
}

/// 启用且未删除的角色
pub async fn list_active_roles(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let roles = state.role_service.find_active().await?;
    Ok(DataResponse::ok(roles))
}

pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<IncludeDeletedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.role_service.find_by_id(id, query.enabled()).await?;
    Ok(DataResponse::ok(role))
}

pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.role_service.update(id, req).await?;
    Ok(DataResponse::ok(role))
}

pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.role_service.soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.role_service.restore(id).await?;
    Ok(DataResponse::ok(role))
}

pub async fn hard_delete_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.role_service.hard_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
