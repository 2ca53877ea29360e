//! HTTP 处理器模块

pub mod auth;
pub mod environment_permission;
pub mod health;
pub mod role;
pub mod role_assignment;
pub mod user;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// 成功响应信封 `{ "data": ... }`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn ok(data: T) -> Response {
        Json(Self { data }).into_response()
    }

    pub fn created(data: T) -> Response {
        (StatusCode::CREATED, Json(Self { data })).into_response()
    }
}

/// `?includeDeleted=` 查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeDeletedQuery {
    pub include_deleted: Option<String>,
}

impl IncludeDeletedQuery {
    pub fn enabled(&self) -> bool {
        flag_enabled(self.include_deleted.as_deref())
    }
}

/// `true`, `1` and `yes` in any case; anything else is false.
pub(crate) fn flag_enabled(value: Option<&str>) -> bool {
    value
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
