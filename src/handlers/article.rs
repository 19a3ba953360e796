//! 文章管理的 HTTP 处理器（业务示例）
//! 列表与详情都先经过数据范围解析，再套用行级谓词

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    handlers::ListParams,
    middleware::AppState,
    models::article::*,
    repository::article_repo::ArticleRepository,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 列出文章（按请求者的数据范围过滤）
pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (_, predicate) = state.scope_service.predicate(auth_context.user_id).await?;

    let (limit, offset) = params.limit_offset();
    let repo = ArticleRepository::new(state.db.clone());
    let articles = repo.list(&predicate, limit, offset).await?;
    let total = repo.count(&predicate).await?;

    Ok(Json(json!({
        "articles": articles,
        "total": total
    })))
}

/// 创建文章（所属部门缺省为创建人的部门）
pub async fn create_article(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Json(req): Json<CreateArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if let Some(level) = req.data_level {
        if !(1..=4).contains(&level) {
            return Err(AppError::BadRequest("数据级别必须在 1..4 之间".to_string()));
        }
    }

    let user_repo = crate::repository::user_repo::UserRepository::new(state.db.clone());
    let user = user_repo
        .find_by_id(&auth_context.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let repo = ArticleRepository::new(state.db.clone());
    let article = repo.create(&req, &user).await?;

    Ok(Json(json!({
        "message": "文章创建成功",
        "article": article
    })))
}

/// 获取文章详情（越权访问表现为 404，不泄露数据存在性）
pub async fn get_article(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (_, predicate) = state.scope_service.predicate(auth_context.user_id).await?;

    let repo = ArticleRepository::new(state.db.clone());
    let article = repo
        .find_scoped(id, &predicate)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(article))
}

/// 更新文章（先按谓词确认可见）
pub async fn update_article(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let (_, predicate) = state.scope_service.predicate(auth_context.user_id).await?;

    let repo = ArticleRepository::new(state.db.clone());
    repo.find_scoped(id, &predicate)
        .await?
        .ok_or(AppError::NotFound)?;

    let article = repo
        .update(id, &req, auth_context.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(json!({
        "message": "文章更新成功",
        "article": article
    })))
}

/// 删除文章（先按谓词确认可见）
pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (_, predicate) = state.scope_service.predicate(auth_context.user_id).await?;

    let repo = ArticleRepository::new(state.db.clone());
    repo.find_scoped(id, &predicate)
        .await?
        .ok_or(AppError::NotFound)?;

    repo.delete(id).await?;

    Ok(Json(json!({
        "message": "文章删除成功"
    })))
}
