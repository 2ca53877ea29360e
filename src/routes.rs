//! 路由注册
//! 按访问策略分组注册路由，每组套一层守卫中间件

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{
    auth::{guard_middleware, AccessPolicy, RouteGuard},
    handlers,
    middleware::{request_tracking_middleware, AppState},
};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    let guarded = |routes: Router<Arc<AppState>>, policy: AccessPolicy| {
        routes.layer(from_fn_with_state(
            RouteGuard::new(state.guard.clone(), policy),
            guard_middleware,
        ))
    };

    // 公开端点
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/health/version", get(handlers::health::version))
        .route("/auth/login", post(handlers::auth::login))
        .route("/api/users", post(handlers::user::create_user));

    // 任意已登录用户
    let authenticated_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/api/users/{id}",
            get(handlers::user::get_user)
                .put(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        );

    // ADMIN, MODERATOR
    let staff_routes = Router::new()
        .route("/api/users", get(handlers::user::list_users))
        .route("/roles", get(handlers::role::list_roles))
        .route(
            "/environment-permissions",
            get(handlers::environment_permission::list_permissions),
        )
        .route(
            "/role-assignments",
            get(handlers::role_assignment::list_assignments),
        )
        .route(
            "/role-assignments/user/{user_id}",
            get(handlers::role_assignment::list_user_assignments),
        );

    // ADMIN, MODERATOR, USER
    let reader_routes = Router::new()
        .route("/roles/active", get(handlers::role::list_active_roles))
        .route("/roles/{id}", get(handlers::role::get_role))
        .route(
            "/environment-permissions/{id}",
            get(handlers::environment_permission::get_permission),
        )
        .route(
            "/environment-permissions/profile/{profile}",
            get(handlers::environment_permission::list_permissions_by_profile),
        )
        .route(
            "/role-assignments/{id}",
            get(handlers::role_assignment::get_assignment),
        )
        .route(
            "/role-assignments/user/{user_id}/active",
            get(handlers::role_assignment::list_active_user_assignments),
        );

    // ADMIN
    let admin_routes = Router::new()
        .route("/api/users/{id}/hard", delete(handlers::user::hard_delete_user))
        .route("/api/users/{id}/restore", post(handlers::user::restore_user))
        .route("/roles", post(handlers::role::create_role))
        .route(
            "/roles/{id}",
            put(handlers::role::update_role).delete(handlers::role::delete_role),
        )
        .route("/roles/{id}/restore", post(handlers::role::restore_role))
        .route("/roles/{id}/hard", delete(handlers::role::hard_delete_role))
        .route(
            "/environment-permissions",
            post(handlers::environment_permission::create_permission),
        )
        .route(
            "/environment-permissions/{id}",
            put(handlers::environment_permission::update_permission)
                .delete(handlers::environment_permission::delete_permission),
        )
        .route(
            "/environment-permissions/{id}/restore",
            post(handlers::environment_permission::restore_permission),
        )
        .route(
            "/environment-permissions/{id}/hard",
            delete(handlers::environment_permission::hard_delete_permission),
        )
        .route(
            "/role-assignments",
            post(handlers::role_assignment::create_assignment),
        )
        .route(
            "/role-assignments/{id}",
            put(handlers::role_assignment::update_assignment)
                .delete(handlers::role_assignment::delete_assignment),
        )
        .route(
            "/role-assignments/{id}/restore",
            post(handlers::role_assignment::restore_assignment),
        )
        .route(
            "/role-assignments/{id}/hard",
            delete(handlers::role_assignment::hard_delete_assignment),
        );

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(guarded(authenticated_routes, AccessPolicy::authenticated()))
        .merge(guarded(staff_routes, AccessPolicy::staff()))
        .merge(guarded(reader_routes, AccessPolicy::any_role()))
        .merge(guarded(admin_routes, AccessPolicy::admin()))
        .layer(RequestBodyLimitLayer::new(state.config.server.body_limit_bytes))
        .layer(axum::middleware::from_fn(request_tracking_middleware))
        .with_state(state)
}
