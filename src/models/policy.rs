//! Policy rule domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Policy rule: one (role, URL pattern, HTTP method) grant
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PolicyRule {
    pub id: Uuid,
    pub role_id: String,
    pub path: String,
    pub method: String,
    pub created_at: DateTime<Utc>,
}

/// (username, role_id) grouping row fed into the enforcement cache
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GroupingRow {
    pub username: String,
    pub role_id: String,
}

/// Grant a single policy rule
#[derive(Debug, Deserialize, Validate)]
pub struct PolicyGrantRequest {
    #[validate(length(min = 1, max = 50))]
    pub role_id: String,
    #[validate(length(min = 1, max = 200))]
    pub path: String,
    #[validate(length(min = 1, max = 10))]
    pub method: String,
}

/// Revoke a single policy rule
#[derive(Debug, Deserialize, Validate)]
pub struct PolicyRevokeRequest {
    #[validate(length(min = 1, max = 50))]
    pub role_id: String,
    #[validate(length(min = 1, max = 200))]
    pub path: String,
    #[validate(length(min = 1, max = 10))]
    pub method: String,
}

/// One URL grant inside a bulk assignment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PolicyRuleEntry {
    #[validate(length(min = 1, max = 200))]
    pub path: String,
    #[validate(length(min = 1, max = 10))]
    pub method: String,
}

/// Replace a role's full rule set (diff-and-replace)
#[derive(Debug, Deserialize)]
pub struct AssignPoliciesRequest {
    pub rules: Vec<PolicyRuleEntry>,
}
