//! 用户管理的 HTTP 处理器

use super::DataResponse;
use crate::{
    auth::Principal,
    error::AppError,
    middleware::AppState,
    models::user::{CreateUserRequest, UpdateUserRequest, UserResponse},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub include_deleted: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListUsersQuery {
    fn include_deleted(&self) -> bool {
        super::flag_enabled(self.include_deleted.as_deref())
    }
}

// 负数按 0 处理，交给服务层报错
fn to_u32(value: Option<i64>) -> Option<u32> {
    value.map(|v| u32::try_from(v.max(0)).unwrap_or(u32::MAX))
}

/// 注册用户（公开，只能注册为 USER）
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.register(req).await?;
    Ok(DataResponse::created(UserResponse::from(user)))
}

/// 分页列出用户
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .user_service
        .find_all(
            query.include_deleted(),
            to_u32(query.page),
            to_u32(query.per_page),
        )
        .await?;

    Ok(Json(page))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.find_by_id(id).await?;
    Ok(DataResponse::ok(UserResponse::from(user)))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.update_as(&principal, id, req).await?;
    Ok(DataResponse::ok(UserResponse::from(user)))
}

/// 软删除用户（本人或 ADMIN）
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.user_service.soft_delete_as(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 永久删除用户
pub async fn hard_delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.user_service.hard_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.restore(id).await?;
    Ok(DataResponse::ok(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_u32_clamps_negative_and_overflow() {
        assert_eq!(to_u32(None), None);
        assert_eq!(to_u32(Some(3)), Some(3));
        assert_eq!(to_u32(Some(-2)), Some(0));
        assert_eq!(to_u32(Some(i64::MAX)), Some(u32::MAX));
    }
}
