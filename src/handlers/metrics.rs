//! 指标处理器
//! 提供 /metrics 端点

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{middleware::AppState, services::enforcer::EnforcerStats};

/// 指标响应
#[derive(Serialize)]
pub struct MetricsResponse {
    pub process_uptime_secs: u64,
    pub db_pool_size: u32,
    pub db_pool_idle: u32,
    pub policy_cache: EnforcerStats,
}

/// 指标暴露端点
pub async fn metrics_export(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    crate::db::record_pool_metrics(&state.db);

    Json(MetricsResponse {
        process_uptime_secs: crate::handlers::health::get_uptime(),
        db_pool_size: state.db.size(),
        db_pool_idle: state.db.num_idle() as u32,
        policy_cache: state.enforcer.stats().await,
    })
}
