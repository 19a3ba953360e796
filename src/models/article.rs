//! Article domain models — the business demo for row-level permissions
//!
//! 文章表携带完整的数据权限字段组，展示受控实体如何接入行级过滤。

use crate::models::scope::GovernedEntity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Article
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub owner_department_id: Option<Uuid>,
    pub is_public: bool,
    pub data_level: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GovernedEntity for Article {
    fn owner_department(&self) -> Option<Uuid> {
        self.owner_department_id
    }

    fn created_by(&self) -> Option<Uuid> {
        self.created_by
    }

    fn is_public(&self) -> bool {
        self.is_public
    }

    fn data_level(&self) -> i16 {
        self.data_level
    }
}

/// Create article request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub content: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    pub status: Option<String>,
    /// 不指定时默认为创建人所属部门
    pub owner_department_id: Option<Uuid>,
    pub is_public: Option<bool>,
    pub data_level: Option<i16>,
}

/// Update article request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateArticleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub content: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    pub status: Option<String>,
    pub is_public: Option<bool>,
    pub data_level: Option<i16>,
}
