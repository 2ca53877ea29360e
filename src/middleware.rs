//! HTTP 中间件与应用状态
//! 请求追踪

use crate::{
    auth::{GuardChain, JwtService, PasswordHasher},
    config::AppConfig,
    error::AppError,
    repository::Storage,
    services::{
        AuthService, EnvironmentPermissionService, RoleAssignmentService, RoleService, UserService,
    },
};
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// Services are built once at startup and shared behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// `None` for the in-memory backend
    pub db: Option<PgPool>,
    pub guard: Arc<GuardChain>,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub role_service: Arc<RoleService>,
    pub environment_permission_service: Arc<EnvironmentPermissionService>,
    pub role_assignment_service: Arc<RoleAssignmentService>,
}

impl AppState {
    pub fn new(config: AppConfig, storage: Storage, db: Option<PgPool>) -> Result<Self, AppError> {
        Self::with_hasher(config, storage, db, PasswordHasher::new())
    }

    pub fn with_hasher(
        config: AppConfig,
        storage: Storage,
        db: Option<PgPool>,
        hasher: PasswordHasher,
    ) -> Result<Self, AppError> {
        let jwt_service = Arc::new(JwtService::from_config(&config)?);
        let hasher = Arc::new(hasher);

        Ok(Self {
            guard: Arc::new(GuardChain::new(jwt_service.clone(), storage.users.clone())),
            auth_service: Arc::new(AuthService::new(&storage, jwt_service, hasher.clone())?),
            user_service: Arc::new(UserService::new(
                &storage,
                hasher,
                &config.security,
                &config.pagination,
            )),
            role_service: Arc::new(RoleService::new(&storage)),
            environment_permission_service: Arc::new(EnvironmentPermissionService::new(&storage)),
            role_assignment_service: Arc::new(RoleAssignmentService::new(&storage)),
            config,
            db,
        })
    }
}

tokio::task_local! {
    static REQUEST_ID: String;
}

/// 当前请求的 request_id（请求追踪中间件之外为 None）
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    // 查询串可能携带令牌，只记录路径
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        // 错误响应体从这里读取 request_id
        let mut response = REQUEST_ID.scope(request_id.clone(), next.run(req)).await;

        let elapsed = start.elapsed();

        // 记录指标 - 使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            204 => "204",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            409 => "409",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            path = %path,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
