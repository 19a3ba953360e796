//! User and identity domain models

use crate::models::role::Role;
use crate::models::scope::DataScope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// User
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub department_id: Option<Uuid>,
    pub data_scope_override: Option<DataScope>,
    pub is_superuser: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The authorization subject a request acts as
///
/// 权限判定与数据范围解析都以这个结构为输入，便于用字面量夹具做单元测试。
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Option<Uuid>,
    pub username: String,
    pub is_authenticated: bool,
    pub is_superuser: bool,
    pub department_id: Option<Uuid>,
    pub scope_override: Option<DataScope>,
}

impl CurrentUser {
    /// 未认证主体
    pub fn anonymous() -> Self {
        CurrentUser {
            id: None,
            username: String::new(),
            is_authenticated: false,
            is_superuser: false,
            department_id: None,
            scope_override: None,
        }
    }

    pub fn from_user(user: &User) -> Self {
        CurrentUser {
            id: Some(user.id),
            username: user.username.clone(),
            is_authenticated: true,
            is_superuser: user.is_superuser,
            department_id: user.department_id,
            scope_override: user.data_scope_override,
        }
    }
}

/// User response (without password hash)
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub department_id: Option<Uuid>,
    pub data_scope_override: Option<DataScope>,
    pub is_superuser: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            department_id: user.department_id,
            data_scope_override: user.data_scope_override,
            is_superuser: user.is_superuser,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    pub password: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub department_id: Option<Uuid>,
}

/// Update user request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub department_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Set custom data-scope override request (`data_scope = None` clears it)
#[derive(Debug, Deserialize)]
pub struct SetScopeOverrideRequest {
    pub data_scope: Option<DataScope>,
}

/// Change password request
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Profile response: user plus roles and effective data scope
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub roles: Vec<Role>,
    pub data_scope: DataScope,
    pub data_scope_label: String,
}
