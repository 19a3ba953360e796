//! User repository (数据库访问层)

use crate::{
    error::AppError,
    models::scope::{DataScope, DepartmentSet, ScopeDecision},
    models::user::*,
};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct UserRepository {
    db: PgPool,
}

impl UserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 根据用户名查找用户
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// 根据 ID 查找用户
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// 创建用户
    pub async fn create(
        &self,
        req: &CreateUserRequest,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, full_name, phone, department_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(password_hash)
        .bind(&req.full_name)
        .bind(&req.phone)
        .bind(req.department_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            AppError::map_unique_violation(e, AppError::BadRequest("用户名已存在".to_string()))
        })?;

        Ok(user)
    }

    /// 更新用户
    pub async fn update(&self, id: Uuid, req: &UpdateUserRequest) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                phone = COALESCE($4, phone),
                department_id = COALESCE($5, department_id),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.email)
        .bind(&req.full_name)
        .bind(&req.phone)
        .bind(req.department_id)
        .bind(req.is_active)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// 停用用户（用户不做物理删除）
    pub async fn deactivate(&self, id: Uuid) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.db)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 设置或清除用户的自定义数据权限覆盖
    pub async fn set_scope_override(
        &self,
        id: Uuid,
        scope: Option<DataScope>,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET data_scope_override = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// 更新密码
    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 记录最近登录时间
    pub async fn update_last_login(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// 列出所有用户
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// 按数据范围列出用户
    ///
    /// 用户表没有受控实体字段组，采用类型特定的回退规则:
    /// 部门范围按部门集合过滤，本人范围只返回自己。
    pub async fn list_scoped(
        &self,
        decision: &ScopeDecision,
        subject: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, AppError> {
        match &decision.departments {
            DepartmentSet::All => self.list(limit, offset).await,
            DepartmentSet::Ids(ids) => {
                if decision.scope == DataScope::SelfOnly {
                    let Some(subject_id) = subject else {
                        return Ok(Vec::new());
                    };
                    let user = self.find_by_id(&subject_id).await?;
                    return Ok(user.into_iter().collect());
                }

                if ids.is_empty() {
                    return Ok(Vec::new());
                }

                let ids: Vec<Uuid> = ids.iter().copied().collect();
                let users = sqlx::query_as::<_, User>(
                    r#"
                    SELECT * FROM users
                    WHERE department_id = ANY($1)
                    ORDER BY created_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(ids)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.db)
                .await?;

                Ok(users)
            }
        }
    }

    /// 统计用户数量
    pub async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?
            .get(0);

        Ok(count)
    }
}
