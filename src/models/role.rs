//! Role domain models

use crate::models::scope::DataScope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Role
///
/// `role_id` 是对外的稳定标识字符串，策略规则与用户分组都以它为键，
/// 与内部主键 `id` 区分开。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub role_id: String,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub data_scope: DataScope,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User-role assignment row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Create role request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 50))]
    pub role_id: String,
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub description: Option<String>,
    pub data_scope: Option<DataScope>,
}

/// Update role request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub data_scope: Option<DataScope>,
    pub is_active: Option<bool>,
}

/// Replace a user's role set (diff-and-replace)
#[derive(Debug, Deserialize)]
pub struct AssignRolesRequest {
    pub role_ids: Vec<Uuid>,
}

/// Role response with display label for its data scope
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    #[serde(flatten)]
    pub role: Role,
    pub data_scope_label: &'static str,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        let data_scope_label = role.data_scope.label();
        RoleResponse {
            role,
            data_scope_label,
        }
    }
}
