//! Policy store (策略规则与用户角色分组的持久层)
//!
//! 唯一性由数据库约束保证，冲突会映射为明确的重复错误而不是静默忽略。

use crate::{
    error::AppError,
    models::policy::{GroupingRow, PolicyRule},
    models::role::UserRole,
};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PolicyRepository {
    db: PgPool,
}

impl PolicyRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Policy rules ====================

    /// 全量读取策略规则，用于缓存重建
    pub async fn all_rules(&self) -> Result<Vec<PolicyRule>, AppError> {
        let rules =
            sqlx::query_as::<_, PolicyRule>("SELECT * FROM policy_rules ORDER BY role_id, path")
                .fetch_all(&self.db)
                .await?;

        Ok(rules)
    }

    /// 全量读取 (username, role_id) 分组关系，仅含激活的角色和用户
    pub async fn all_groupings(&self) -> Result<Vec<GroupingRow>, AppError> {
        let groupings = sqlx::query_as::<_, GroupingRow>(
            r#"
            SELECT u.username, r.role_id
            FROM user_roles ur
            JOIN users u ON ur.user_id = u.id
            JOIN roles r ON ur.role_id = r.id
            WHERE r.is_active AND u.is_active
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(groupings)
    }

    /// 插入策略规则，重复时返回 DuplicateRule
    pub async fn insert_rule(
        &self,
        role_id: &str,
        path: &str,
        method: &str,
    ) -> Result<PolicyRule, AppError> {
        let rule = sqlx::query_as::<_, PolicyRule>(
            r#"
            INSERT INTO policy_rules (role_id, path, method)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(role_id)
        .bind(path)
        .bind(method)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::map_unique_violation(e, AppError::DuplicateRule))?;

        Ok(rule)
    }

    /// 删除策略规则
    pub async fn delete_rule(
        &self,
        role_id: &str,
        path: &str,
        method: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM policy_rules WHERE role_id = $1 AND path = $2 AND method = $3",
        )
        .bind(role_id)
        .bind(path)
        .bind(method)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 获取角色的所有策略规则
    pub async fn rules_for_role(&self, role_id: &str) -> Result<Vec<PolicyRule>, AppError> {
        let rules = sqlx::query_as::<_, PolicyRule>(
            "SELECT * FROM policy_rules WHERE role_id = $1 ORDER BY path, method",
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rules)
    }

    /// 删除角色的全部策略规则（角色删除或全量重授时使用）
    pub async fn delete_rules_for_role(&self, role_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM policy_rules WHERE role_id = $1")
            .bind(role_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    // ==================== User-role assignments ====================

    /// 插入用户角色分配，重复时返回 DuplicateAssignment
    pub async fn insert_assignment(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<UserRole, AppError> {
        let assignment = sqlx::query_as::<_, UserRole>(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::map_unique_violation(e, AppError::DuplicateAssignment))?;

        Ok(assignment)
    }

    /// 删除用户角色分配
    pub async fn delete_assignment(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
