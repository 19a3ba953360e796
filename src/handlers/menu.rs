//! 菜单管理的 HTTP 处理器

use crate::{
    error::AppError,
    middleware::AppState,
    models::menu::*,
    repository::menu_repo::MenuRepository,
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

/// 菜单树
pub async fn list_menus(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let repo = MenuRepository::new(state.db.clone());
    let menus = repo.list_all().await?;
    let tree = build_menu_tree(&menus);

    Ok(Json(json!({ "menus": tree })))
}

/// 创建菜单
pub async fn create_menu(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMenuRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if let Some(parent_id) = req.parent_id {
        let repo = MenuRepository::new(state.db.clone());
        repo.find_by_id(&parent_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("上级菜单不存在".to_string()))?;
    }

    let repo = MenuRepository::new(state.db.clone());
    let menu = repo.create(&req).await?;

    Ok(Json(json!({
        "message": "菜单创建成功",
        "menu": menu
    })))
}

/// 更新菜单
pub async fn update_menu(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMenuRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = MenuRepository::new(state.db.clone());
    let menu = repo.update(id, &req).await?.ok_or(AppError::NotFound)?;

    Ok(Json(json!({
        "message": "菜单更新成功",
        "menu": menu
    })))
}

/// 删除菜单
pub async fn delete_menu(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = MenuRepository::new(state.db.clone());
    let deleted = repo.delete(id).await?;

    if !deleted {
        return Err(AppError::NotFound);
    }

    Ok(Json(json!({
        "message": "菜单删除成功"
    })))
}
