//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, middleware::AppState};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 认证路由（无需令牌）
    let auth_routes = Router::new()
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh_token));

    // 需要认证的路由，权限网关在 JWT 认证之后运行
    let authenticated_routes = Router::new()
        // 当前用户
        .route("/api/v1/auth/profile", get(handlers::auth::profile))
        .route("/api/v1/auth/menus", get(handlers::auth::my_menus))
        .route("/api/v1/auth/password", put(handlers::auth::change_password))

        // 用户管理
        .route(
            "/api/v1/users",
            get(handlers::user::list_users)
                .post(handlers::user::create_user)
        )
        .route(
            "/api/v1/users/{id}",
            get(handlers::user::get_user)
                .put(handlers::user::update_user)
                .delete(handlers::user::delete_user)
        )
        .route("/api/v1/users/{id}/roles", post(handlers::user::assign_roles))
        .route("/api/v1/users/{id}/scope", put(handlers::user::set_scope_override))

        // 角色管理
        .route(
            "/api/v1/roles",
            get(handlers::role::list_roles)
                .post(handlers::role::create_role)
        )
        .route(
            "/api/v1/roles/{id}",
            get(handlers::role::get_role)
                .put(handlers::role::update_role)
                .delete(handlers::role::delete_role)
        )
        .route(
            "/api/v1/roles/{id}/policies",
            get(handlers::role::get_role_policies)
                .post(handlers::role::assign_role_policies)
        )
        .route(
            "/api/v1/roles/{id}/menus",
            get(handlers::role::get_role_menus)
                .post(handlers::role::assign_role_menus)
        )

        // 部门管理
        .route(
            "/api/v1/departments",
            get(handlers::department::list_departments)
                .post(handlers::department::create_department)
        )
        .route("/api/v1/departments/tree", get(handlers::department::department_tree))
        .route(
            "/api/v1/departments/{id}",
            get(handlers::department::get_department)
                .put(handlers::department::update_department)
                .delete(handlers::department::delete_department)
        )
        .route(
            "/api/v1/departments/{id}/parent",
            put(handlers::department::reparent_department)
        )

        // 菜单管理
        .route(
            "/api/v1/menus",
            get(handlers::menu::list_menus)
                .post(handlers::menu::create_menu)
        )
        .route(
            "/api/v1/menus/{id}",
            put(handlers::menu::update_menu)
                .delete(handlers::menu::delete_menu)
        )

        // 策略授权
        .route(
            "/api/v1/policies",
            post(handlers::policy::grant_policy)
                .delete(handlers::policy::revoke_policy)
        )
        .route("/api/v1/policies/reload", post(handlers::policy::reload_policies))

        // 业务示例：文章
        .route(
            "/api/v1/articles",
            get(handlers::article::list_articles)
                .post(handlers::article::create_article)
        )
        .route(
            "/api/v1/articles/{id}",
            get(handlers::article::get_article)
                .put(handlers::article::update_article)
                .delete(handlers::article::delete_article)
        )
        // 层从外到内执行：先 JWT 认证注入身份，再过权限网关
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::permission_gate_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.jwt_service.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    // 指标端点
    let metrics_routes = Router::new().route("/metrics", get(handlers::metrics::metrics_export));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(authenticated_routes)
        .merge(metrics_routes)
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
