//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthFailure),

    #[error("Access denied")]
    Forbidden,

    #[error("{0}")]
    NotFound(#[from] NotFound),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Conflict(#[from] ConflictReason),

    #[error("End date must be after start date")]
    InvalidDateRange,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Why a request could not be authenticated.
///
/// The distinction is kept for logs; [`AuthFailure::public_message`] collapses
/// the variants that would otherwise let a caller enumerate accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("no credential supplied")]
    MissingCredential,

    #[error("credential expired")]
    Expired,

    #[error("credential malformed or signature invalid")]
    Malformed,

    #[error("user not found or deleted")]
    UserNotFoundOrDeleted,

    /// Login with an unknown email or a wrong password.
    #[error("email or password rejected")]
    InvalidCredentials,
}

impl AuthFailure {
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthFailure::MissingCredential => "Authentication required",
            AuthFailure::Expired => "Token expired",
            AuthFailure::Malformed
            | AuthFailure::UserNotFoundOrDeleted
            | AuthFailure::InvalidCredentials => "Invalid credentials",
        }
    }
}

/// Subject of a not-found failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("{0} not found")]
    Entity(&'static str),

    #[error("User not found")]
    User,

    #[error("Grantor user not found")]
    Grantor,

    /// Every referenced id that failed to resolve, reported together.
    #[error("{}", describe_missing(.role_ids, .environment_ids))]
    References {
        role_ids: Vec<Uuid>,
        environment_ids: Vec<Uuid>,
    },
}

fn describe_missing(role_ids: &[Uuid], environment_ids: &[Uuid]) -> String {
    let join = |ids: &[Uuid]| {
        ids.iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut parts = Vec::new();
    if !role_ids.is_empty() {
        parts.push(format!("The following role IDs were not found: {}", join(role_ids)));
    }
    if !environment_ids.is_empty() {
        parts.push(format!(
            "The following environment permission IDs were not found: {}",
            join(environment_ids)
        ));
    }
    parts.join("; ")
}

/// Reason a state-changing operation conflicts with current data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictReason {
    #[error("Cannot delete {entity}: it is currently being used in {count} role assignment(s)")]
    InUse { entity: &'static str, count: usize },

    #[error("{entity} is not deleted")]
    NotDeleted { entity: &'static str },

    #[error("{0}")]
    EmailTaken(&'static str),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidDateRange | AppError::BadRequest(_) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::Authentication(failure) => failure.public_message().to_string(),
            AppError::Forbidden => "You do not have permission to access this resource".to_string(),
            AppError::NotFound(subject) => subject.to_string(),
            AppError::AlreadyExists(msg) | AppError::BadRequest(msg) | AppError::Validation(msg) => {
                msg.clone()
            }
            AppError::Conflict(reason) => reason.to_string(),
            AppError::InvalidDateRange => "End date must be after start date".to_string(),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    // 便捷方法
    pub fn not_found(entity: &'static str) -> Self {
        AppError::NotFound(NotFound::Entity(entity))
    }

    pub fn validation(msg: &str) -> Self {
        AppError::Validation(msg.to_string())
    }

    pub fn internal_error(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // 与 x-request-id 响应头一致；中间件之外才临时生成
        let request_id = crate::middleware::current_request_id()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.user_message(),
                request_id,
            },
        };

        // 4xx 是调用方错误，只有 5xx 记录为 error
        if status.is_server_error() {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Application error"
            );
        } else {
            tracing::info!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Request rejected"
            );
        }

        (status, Json(error_response)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::Unauthorized.code(), 401);
        assert_eq!(AppError::Authentication(AuthFailure::Expired).code(), 401);
        assert_eq!(AppError::Forbidden.code(), 403);
        assert_eq!(AppError::not_found("Role").code(), 404);
        assert_eq!(AppError::AlreadyExists("dup".to_string()).code(), 409);
        assert_eq!(AppError::InvalidDateRange.code(), 400);
        assert_eq!(
            AppError::Conflict(ConflictReason::NotDeleted { entity: "Role" }).code(),
            409
        );
    }

    #[test]
    fn test_user_message_no_sensitive_info() {
        let error = AppError::Database(sqlx::Error::RowNotFound);
        let message = error.user_message();
        assert_eq!(message, "Database error occurred");
        assert!(!message.contains("sqlx"));
    }

    #[test]
    fn test_auth_failures_do_not_enumerate_users() {
        let deleted = AppError::from(AuthFailure::UserNotFoundOrDeleted).user_message();
        let forged = AppError::from(AuthFailure::Malformed).user_message();
        assert_eq!(deleted, forged);
    }

    #[test]
    fn test_missing_references_lists_every_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let e = Uuid::new_v4();
        let message = NotFound::References {
            role_ids: vec![a, b],
            environment_ids: vec![e],
        }
        .to_string();

        assert!(message.contains(&a.to_string()));
        assert!(message.contains(&b.to_string()));
        assert!(message.contains(&e.to_string()));
    }
}
