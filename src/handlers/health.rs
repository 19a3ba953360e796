//! 健康检查处理器
//! 提供 /health 和 /ready 端点

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Instant;

use crate::{db, middleware::AppState};

/// 存活探针响应
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// 就绪探针响应
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<HealthCheck>,
}

/// 健康检查项
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

static APP_START_TIME: OnceLock<Instant> = OnceLock::new();

/// 设置应用启动时间（在 main.rs 中调用一次）
pub fn set_start_time() {
    let _ = APP_START_TIME.set(Instant::now());
}

/// 获取应用运行时间（秒）
pub fn get_uptime() -> u64 {
    APP_START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// 存活探针
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: get_uptime(),
    })
}

/// 就绪探针：检查数据库连通性与策略缓存状态
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let mut checks = Vec::new();
    let mut ready = true;

    match db::health_check(&state.db).await {
        db::HealthStatus::Healthy => checks.push(HealthCheck {
            name: "database".to_string(),
            status: "ok".to_string(),
            message: None,
        }),
        db::HealthStatus::Unhealthy(msg) => {
            ready = false;
            checks.push(HealthCheck {
                name: "database".to_string(),
                status: "error".to_string(),
                message: Some(msg),
            });
        }
    }

    // 策略缓存未预热不算不可用，首次 check 会同步加载
    let stats = state.enforcer.stats().await;
    checks.push(HealthCheck {
        name: "policy_cache".to_string(),
        status: if stats.warm { "ok" } else { "cold" }.to_string(),
        message: None,
    });

    Json(ReadinessResponse { ready, checks })
}
