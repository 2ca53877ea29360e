//! 测试公共模块
//! 提供测试辅助函数和测试工具，全部基于内存存储

#![allow(dead_code)]

use access_admin::{
    auth::{JwtService, PasswordHasher},
    config::{
        AppConfig, BootstrapConfig, DatabaseConfig, LoggingConfig, PaginationConfig,
        SecurityConfig, ServerConfig, StorageBackend,
    },
    middleware::AppState,
    models::user::{CreateUserRequest, User, UserRole},
    repository::Storage,
    routes,
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only-min-32-chars";
pub const TEST_PASSWORD: &str = "s3cret-pass";

/// 创建测试配置
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(),
            graceful_shutdown_timeout_secs: 5,
            body_limit_bytes: 1024 * 1024,
        },
        database: DatabaseConfig {
            backend: StorageBackend::Memory,
            url: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            jwt_secret: Secret::new(TEST_SECRET.to_string()),
            access_token_exp_secs: 300,
            password_min_length: 6,
        },
        pagination: PaginationConfig {
            default_per_page: 10,
            max_per_page: 100,
        },
        bootstrap: BootstrapConfig::default(),
    }
}

/// 创建测试应用状态（低成本哈希参数）
pub fn create_test_app_state() -> Arc<AppState> {
    let state = AppState::with_hasher(
        create_test_config(),
        Storage::in_memory(),
        None,
        PasswordHasher::low_cost(),
    )
    .expect("Failed to build test app state");
    Arc::new(state)
}

pub fn create_test_app() -> (Router, Arc<AppState>) {
    let state = create_test_app_state();
    (routes::create_router(state.clone()), state)
}

/// 创建测试用户
pub async fn create_test_user(state: &AppState, email: &str, role: UserRole) -> User {
    state
        .user_service
        .create(CreateUserRequest {
            name: format!("{} user", role),
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            role: Some(role),
        })
        .await
        .expect("Failed to create test user")
}

pub fn token_for(user: &User) -> String {
    JwtService::new(TEST_SECRET, 300)
        .unwrap()
        .generate_access_token(user)
        .unwrap()
}

/// 创建用户并签发令牌
pub async fn login_as(state: &AppState, email: &str, role: UserRole) -> (User, String) {
    let user = create_test_user(state, email, role).await;
    let token = token_for(&user);
    (user, token)
}

/// 发送请求，返回状态码和 JSON（空响应体为 Null）
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    read_json(response).await
}

pub async fn read_json(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
