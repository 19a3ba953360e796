//! 认证相关的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::menu::build_menu_tree,
    models::user::*,
    repository::{role_repo::RoleRepository, user_repo::UserRepository},
};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth_service.login(req).await?;
    Ok(Json(response))
}

/// 刷新令牌
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token_pair = state.auth_service.refresh_token(req).await?;
    Ok(Json(token_pair))
}

/// 当前用户信息：用户资料、角色、有效数据范围
pub async fn profile(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let user_repo = UserRepository::new(state.db.clone());
    let user = user_repo
        .find_by_id(&auth_context.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let role_repo = RoleRepository::new(state.db.clone());
    let roles = role_repo.roles_for_user(user.id).await?;

    let decision = state.scope_service.resolve_for(&user).await?;

    Ok(Json(ProfileResponse {
        user: UserResponse::from(user),
        roles,
        data_scope: decision.scope,
        data_scope_label: decision.scope.label().to_string(),
    }))
}

/// 当前用户可见的菜单树
pub async fn my_menus(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let role_repo = RoleRepository::new(state.db.clone());

    let menus = if auth_context.is_superuser {
        // 超级用户可见全部激活菜单
        let menu_repo = crate::repository::menu_repo::MenuRepository::new(state.db.clone());
        menu_repo
            .list_all()
            .await?
            .into_iter()
            .filter(|m| m.is_active && m.visible)
            .collect()
    } else {
        let roles = role_repo.roles_for_user(auth_context.user_id).await?;
        let role_ids: Vec<uuid::Uuid> = roles.iter().map(|r| r.id).collect();
        role_repo.menus_for_roles(&role_ids).await?
    };

    let tree = build_menu_tree(&menus);
    Ok(Json(json!({ "menus": tree })))
}

/// 修改自己的密码
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth_service
        .change_password(auth_context.user_id, &req, &state.config)
        .await?;

    Ok(Json(json!({ "message": "密码修改成功" })))
}
