//! 策略授权的 HTTP 处理器
//! 单条授予/撤销都走执行引擎的双写路径

use crate::{
    error::AppError,
    middleware::AppState,
    models::policy::*,
    repository::role_repo::RoleRepository,
};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

/// 授予单条策略规则
pub async fn grant_policy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PolicyGrantRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // 校验角色存在，避免悬空的规则
    let role_repo = RoleRepository::new(state.db.clone());
    role_repo
        .find_by_role_id(&req.role_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("角色不存在".to_string()))?;

    let created = state
        .enforcer
        .add_rule(&req.role_id, &req.path, &req.method)
        .await?;

    let message = if created { "授权成功" } else { "规则已存在" };
    Ok(Json(json!({
        "message": message,
        "created": created
    })))
}

/// 撤销单条策略规则
pub async fn revoke_policy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PolicyRevokeRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let removed = state
        .enforcer
        .remove_rule(&req.role_id, &req.path, &req.method)
        .await?;

    let message = if removed { "撤销成功" } else { "规则不存在" };
    Ok(Json(json!({
        "message": message,
        "removed": removed
    })))
}

/// 强制全量重载策略缓存
pub async fn reload_policies(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    state.enforcer.reload().await?;
    let stats = state.enforcer.stats().await;

    Ok(Json(json!({
        "message": "策略重载成功",
        "stats": stats
    })))
}
