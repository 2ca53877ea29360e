//! 环境权限目录的 HTTP 处理器

use super::{DataResponse, IncludeDeletedQuery};
use crate::{
    error::AppError,
    middleware::AppState,
    models::environment_permission::{
        CreateEnvironmentPermissionRequest, UpdateEnvironmentPermissionRequest,
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

pub async fn create_permission(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEnvironmentPermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let permission = state.environment_permission_service.create(req).await?;
    Ok(DataResponse::created(permission))
}

pub async fn list_permissions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IncludeDeletedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let permissions = state
        .environment_permission_service
        .find_all(query.enabled())
        .await?;
    Ok(DataResponse::ok(permissions))
}

pub async fn get_permission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<IncludeDeletedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let permission = state
        .environment_permission_service
        .find_by_id(id, query.enabled())
        .await?;
    Ok(DataResponse::ok(permission))
}

/// 按部署档位查询
pub async fn list_permissions_by_profile(
    State(state): State<Arc<AppState>>,
    Path(profile): Path<String>,
    Query(query): Query<IncludeDeletedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let permissions = state
        .environment_permission_service
        .find_by_profile(&profile, query.enabled())
        .await?;
    Ok(DataResponse::ok(permissions))
}

pub async fn update_permission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEnvironmentPermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let permission = state
        .environment_permission_service
        .update(id, req)
        .await?;
    Ok(DataResponse::ok(permission))
}

pub async fn delete_permission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.environment_permission_service.soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_permission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let permission = state.environment_permission_service.restore(id).await?;
    Ok(DataResponse::ok(permission))
}

pub async fn hard_delete_permission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.environment_permission_service.hard_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
