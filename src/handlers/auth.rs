//! 认证相关的 HTTP 处理器

use crate::{
    auth::Principal,
    error::AppError,
    middleware::AppState,
    models::auth::LoginRequest,
};
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

/// 用户登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth_service.login(req).await?;
    Ok(Json(response))
}

/// 获取当前用户信息
pub async fn me(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.current_user(&principal).await?;
    Ok(Json(user))
}
