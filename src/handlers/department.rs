//! 部门管理的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::department::*,
    repository::department_repo::DepartmentRepository,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 列出部门（按请求者的数据范围过滤）
pub async fn list_departments(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let (_, decision) = state.scope_service.resolve(auth_context.user_id).await?;

    let repo = DepartmentRepository::new(state.db.clone());
    let departments = repo.list_scoped(&decision).await?;

    Ok(Json(json!({
        "departments": departments,
        "count": departments.len()
    })))
}

/// 部门树（按请求者的数据范围过滤后组装）
pub async fn department_tree(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let (_, decision) = state.scope_service.resolve(auth_context.user_id).await?;

    let repo = DepartmentRepository::new(state.db.clone());
    let departments = repo.list_scoped(&decision).await?;
    let tree = build_department_tree(&departments);

    Ok(Json(json!({ "departments": tree })))
}

/// 创建部门
pub async fn create_department(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDepartmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = DepartmentRepository::new(state.db.clone());
    let department = repo.create(&req).await?;

    Ok(Json(json!({
        "message": "部门创建成功",
        "department": department
    })))
}

/// 获取部门详情，附带从根到该部门的路径
pub async fn get_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = DepartmentRepository::new(state.db.clone());
    let department = repo.find_by_id(&id).await?.ok_or(AppError::NotFound)?;

    let all = repo.list_all().await?;
    let names: HashMap<Uuid, String> = all.iter().map(|d| (d.id, d.name.clone())).collect();
    let tree = DepartmentTree::from_departments(&all);

    let path: Vec<String> = tree
        .path(id)
        .into_iter()
        .filter_map(|node_id| names.get(&node_id).cloned())
        .collect();

    Ok(Json(json!({
        "department": department,
        "path": path
    })))
}

/// 更新部门基础信息
pub async fn update_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDepartmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = DepartmentRepository::new(state.db.clone());
    let department = repo.update(id, &req).await?.ok_or(AppError::NotFound)?;

    Ok(Json(json!({
        "message": "部门更新成功",
        "department": department
    })))
}

/// 调整部门上级（级联重算子树层级）
pub async fn reparent_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReparentDepartmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = DepartmentRepository::new(state.db.clone());
    let department = repo.reparent(id, req.parent_id).await?;

    Ok(Json(json!({
        "message": "部门移动成功",
        "department": department
    })))
}

/// 删除部门
pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = DepartmentRepository::new(state.db.clone());
    let deleted = repo.delete(id).await?;

    if !deleted {
        return Err(AppError::NotFound);
    }

    Ok(Json(json!({
        "message": "部门删除成功"
    })))
}
