//! 用户管理的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    auth::password::PasswordHasher,
    error::AppError,
    handlers::ListParams,
    middleware::AppState,
    models::role::AssignRolesRequest,
    models::user::*,
    repository::{role_repo::RoleRepository, user_repo::UserRepository},
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 列出用户（按请求者的数据范围过滤）
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (_, decision) = state.scope_service.resolve(auth_context.user_id).await?;

    let (limit, offset) = params.limit_offset();
    let repo = UserRepository::new(state.db.clone());
    let users = repo
        .list_scoped(&decision, Some(auth_context.user_id), limit, offset)
        .await?;

    let user_responses: Vec<UserResponse> = users.into_iter().map(|u| u.into()).collect();

    Ok(Json(json!({
        "users": user_responses,
        "count": user_responses.len()
    })))
}

/// 创建用户
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // 验证密码策略
    PasswordHasher::validate_password_policy(&req.password, &state.config)?;

    // 哈希密码
    let hasher = PasswordHasher::new();
    let password_hash = hasher.hash(&req.password)?;

    let repo = UserRepository::new(state.db.clone());
    let user = repo.create(&req, &password_hash).await?;

    Ok(Json(json!({
        "message": "用户创建成功",
        "user": UserResponse::from(user)
    })))
}

/// 获取用户详情
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = UserRepository::new(state.db.clone());
    let user = repo.find_by_id(&id).await?.ok_or(AppError::NotFound)?;

    let role_repo = RoleRepository::new(state.db.clone());
    let roles = role_repo.roles_for_user(user.id).await?;

    Ok(Json(json!({
        "user": UserResponse::from(user),
        "roles": roles
    })))
}

/// 更新用户
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = UserRepository::new(state.db.clone());
    let user = repo.update(id, &req).await?.ok_or(AppError::NotFound)?;

    // 停用用户后从执行缓存清理其分组，立刻对后续请求生效
    if req.is_active == Some(false) {
        state.enforcer.purge_user(&user.username).await;
    }

    Ok(Json(json!({
        "message": "用户更新成功",
        "user": UserResponse::from(user)
    })))
}

/// 删除用户（软删除：停用账户，保留数据）
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // 不允许停用自己
    if id == auth_context.user_id {
        return Err(AppError::BadRequest("不能停用自己的账户".to_string()));
    }

    let repo = UserRepository::new(state.db.clone());
    let user = repo.find_by_id(&id).await?.ok_or(AppError::NotFound)?;

    repo.deactivate(id).await?;
    state.enforcer.purge_user(&user.username).await;

    Ok(Json(json!({
        "message": "用户已停用"
    })))
}

/// 全量替换用户的角色（diff-and-replace 语义，逐条双写执行缓存）
pub async fn assign_roles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRolesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_repo = UserRepository::new(state.db.clone());
    let user = user_repo.find_by_id(&id).await?.ok_or(AppError::NotFound)?;

    let role_repo = RoleRepository::new(state.db.clone());
    let current = role_repo.roles_for_user(user.id).await?;

    let desired: HashSet<Uuid> = req.role_ids.iter().copied().collect();
    let held: HashSet<Uuid> = current.iter().map(|r| r.id).collect();

    let mut added = 0;
    let mut removed = 0;

    for role in &current {
        if !desired.contains(&role.id) {
            if state.enforcer.remove_grouping(&user, role).await? {
                removed += 1;
            }
        }
    }

    for role_id in &desired {
        if held.contains(role_id) {
            continue;
        }
        let role = role_repo
            .find_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("角色不存在".to_string()))?;
        // 已存在的分配按幂等处理
        if state.enforcer.add_grouping(&user, &role).await? {
            added += 1;
        }
    }

    Ok(Json(json!({
        "message": "角色分配成功",
        "added": added,
        "removed": removed
    })))
}

/// 设置或清除用户的自定义数据权限覆盖
pub async fn set_scope_override(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetScopeOverrideRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .set_scope_override(id, req.data_scope)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(json!({
        "message": "数据权限设置成功",
        "user": UserResponse::from(user)
    })))
}
