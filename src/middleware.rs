//! HTTP 中间件
//! 请求追踪与权限网关

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    models::user::CurrentUser,
};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// AppState 内部使用 Arc 包装服务,这样:
/// 1. 多个请求可以共享服务实例
/// 2. 服务可以包含内部的可变状态(如果需要)
/// 3. Clone 成本低廉(Arc 是指针拷贝)
///
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::AppConfig,
    pub db: sqlx::PgPool,
    // 服务使用 Arc 包装,因为服务内部可能包含 Arc 或其他共享状态
    pub auth_service: Arc<crate::services::AuthService>,
    pub enforcer: Arc<crate::services::Enforcer>,
    pub scope_service: Arc<crate::services::ScopeService>,
    pub jwt_service: Arc<crate::auth::jwt::JwtService>,
}

/// 权限网关豁免的路径前缀
///
/// 健康检查与指标是公共端点；登录/刷新发生在拿到身份之前；
/// profile 和个人菜单是登录用户的自服务端点，不占用策略规则。
const EXEMPT_PREFIXES: &[&str] = &[
    "/health",
    "/ready",
    "/metrics",
    "/api/v1/auth/login",
    "/api/v1/auth/refresh",
    "/api/v1/auth/profile",
    "/api/v1/auth/menus",
    "/api/v1/auth/password",
];

/// 判断路径是否豁免权限检查
pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// 权限网关中间件
///
/// 在 JWT 认证之后运行：取出请求主体与 (path, method)，交给执行引擎判定。
/// 拒绝时返回通用的 403 响应，不泄露缺失的规则。
pub async fn permission_gate_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path().to_string();
    let method = req.method().as_str().to_string();

    if is_exempt(&path) {
        return Ok(next.run(req).await);
    }

    let subject = match req.extensions().get::<AuthContext>() {
        Some(ctx) => CurrentUser {
            id: Some(ctx.user_id),
            username: ctx.username.clone(),
            is_authenticated: true,
            is_superuser: ctx.is_superuser,
            department_id: None,
            scope_override: None,
        },
        None => CurrentUser::anonymous(),
    };

    let allowed = state.enforcer.check(&subject, &path, &method).await?;

    if !allowed {
        metrics::counter!("rbac_checks_total", "outcome" => "deny").increment(1);
        tracing::warn!(
            username = %subject.username,
            %path,
            %method,
            "Permission denied"
        );
        return Err(AppError::Forbidden);
    }

    metrics::counter!("rbac_checks_total", "outcome" => "allow").increment(1);

    Ok(next.run(req).await)
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    // 生成或提取 trace_id/request_id
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().to_string();

    // 创建 span
    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();

        // 继续处理请求
        let response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        metrics::counter!("http_requests_total").increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        // 记录日志
        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        // 在响应头中添加 trace_id
        let mut response = response;
        if let Ok(value) = trace_id.parse() {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = request_id.parse() {
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
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_or_generate_trace_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", "test-trace-123".parse().unwrap());

        let trace_id = extract_or_generate_trace_id(&headers);
        assert_eq!(trace_id, "test-trace-123");

        let headers = HeaderMap::new();
        let trace_id = extract_or_generate_trace_id(&headers);
        assert!(!trace_id.is_empty());
        assert_ne!(trace_id, "test-trace-123");
    }

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt("/health"));
        assert!(is_exempt("/api/v1/auth/login"));
        assert!(is_exempt("/api/v1/auth/profile"));
        assert!(!is_exempt("/api/v1/users"));
        assert!(!is_exempt("/api/v1/articles"));
    }
}
