//! 角色管理的 HTTP 处理器

use crate::{
    error::AppError,
    middleware::AppState,
    models::menu::AssignMenusRequest,
    models::policy::AssignPoliciesRequest,
    models::role::*,
    repository::{policy_repo::PolicyRepository, role_repo::RoleRepository},
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 列出角色
pub async fn list_roles(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let repo = RoleRepository::new(state.db.clone());
    let roles = repo.list().await?;

    let responses: Vec<RoleResponse> = roles.into_iter().map(RoleResponse::from).collect();

    Ok(Json(json!({
        "roles": responses,
        "count": responses.len()
    })))
}

/// 创建角色
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = RoleRepository::new(state.db.clone());
    let role = repo.create(&req).await?;

    Ok(Json(json!({
        "message": "角色创建成功",
        "role": RoleResponse::from(role)
    })))
}

/// 获取角色详情
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = RoleRepository::new(state.db.clone());
    let role = repo.find_by_id(&id).await?.ok_or(AppError::NotFound)?;

    Ok(Json(RoleResponse::from(role)))
}

/// 更新角色
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let activation_changed = req.is_active.is_some();

    let repo = RoleRepository::new(state.db.clone());
    let role = repo.update(id, &req).await?.ok_or(AppError::NotFound)?;

    // 激活状态变化影响分组关系，整体重载缓存收敛
    if activation_changed {
        state.enforcer.reload().await?;
    }

    Ok(Json(json!({
        "message": "角色更新成功",
        "role": RoleResponse::from(role)
    })))
}

/// 删除角色（关联的用户角色与菜单授权级联删除，策略规则一并清理）
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = RoleRepository::new(state.db.clone());
    let role = repo.find_by_id(&id).await?.ok_or(AppError::NotFound)?;

    repo.delete(id).await?;
    state.enforcer.purge_role(&role.role_id).await?;

    Ok(Json(json!({
        "message": "角色删除成功"
    })))
}

/// 获取角色的策略规则
pub async fn get_role_policies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let role_repo = RoleRepository::new(state.db.clone());
    let role = role_repo.find_by_id(&id).await?.ok_or(AppError::NotFound)?;

    let policy_repo = PolicyRepository::new(state.db.clone());
    let rules = policy_repo.rules_for_role(&role.role_id).await?;

    Ok(Json(json!({
        "role_id": role.role_id,
        "rules": rules
    })))
}

/// 全量替换角色的策略规则
pub async fn assign_role_policies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignPoliciesRequest>,
) -> Result<impl IntoResponse, AppError> {
    for entry in &req.rules {
        entry
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
    }

    let role_repo = RoleRepository::new(state.db.clone());
    let role = role_repo.find_by_id(&id).await?.ok_or(AppError::NotFound)?;

    let entries: Vec<(String, String)> = req
        .rules
        .iter()
        .map(|r| (r.path.clone(), r.method.clone()))
        .collect();

    let applied = state.enforcer.replace_role_rules(&role.role_id, &entries).await?;

    Ok(Json(json!({
        "message": "API权限分配成功",
        "applied": applied
    })))
}

/// 获取角色的菜单授权
pub async fn get_role_menus(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = RoleRepository::new(state.db.clone());
    let role = repo.find_by_id(&id).await?.ok_or(AppError::NotFound)?;

    let menu_ids = repo.menu_ids_for_role(role.id).await?;

    Ok(Json(json!({
        "menu_ids": menu_ids
    })))
}

/// 全量替换角色的菜单授权（只影响界面可见性）
pub async fn assign_role_menus(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignMenusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = RoleRepository::new(state.db.clone());
    let role = repo.find_by_id(&id).await?.ok_or(AppError::NotFound)?;

    repo.set_role_menus(role.id, &req.menu_ids).await?;

    Ok(Json(json!({
        "message": "菜单权限分配成功"
    })))
}
