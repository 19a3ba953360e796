//! Role repository (角色数据访问)

use crate::{
    error::AppError,
    models::menu::Menu,
    models::role::*,
    models::scope::DataScope,
};
use sqlx::PgPool;
use uuid::Uuid;

pub struct RoleRepository {
    db: PgPool,
}

impl RoleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Roles ====================

    /// 列出所有角色
    pub async fn list(&self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY created_at")
            .fetch_all(&self.db)
            .await?;

        Ok(roles)
    }

    /// 根据 ID 查找角色
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(role)
    }

    /// 根据外部角色标识查找角色
    pub async fn find_by_role_id(&self, role_id: &str) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE role_id = $1")
            .bind(role_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(role)
    }

    /// 创建角色
    pub async fn create(&self, req: &CreateRoleRequest) -> Result<Role, AppError> {
        let data_scope = req.data_scope.unwrap_or(DataScope::SelfOnly);

        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (role_id, name, code, description, data_scope)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&req.role_id)
        .bind(&req.name)
        .bind(&req.code)
        .bind(&req.description)
        .bind(data_scope)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            AppError::map_unique_violation(
                e,
                AppError::BadRequest("角色标识、名称或编码已存在".to_string()),
            )
        })?;

        Ok(role)
    }

    /// 更新角色
    pub async fn update(&self, id: Uuid, req: &UpdateRoleRequest) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                data_scope = COALESCE($4, data_scope),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.data_scope)
        .bind(req.is_active)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    /// 删除角色 (user_roles 和 role_menus 由外键级联删除)
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== User roles ====================

    /// 获取用户持有的激活角色
    pub async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.*
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1 AND r.is_active
            ORDER BY r.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    /// 获取用户激活角色的数据权限范围集合
    pub async fn scopes_for_user(&self, user_id: Uuid) -> Result<Vec<DataScope>, AppError> {
        let roles = self.roles_for_user(user_id).await?;
        Ok(roles.into_iter().map(|r| r.data_scope).collect())
    }

    // ==================== Role menus ====================

    /// 获取角色关联的菜单 ID 集合
    pub async fn menu_ids_for_role(&self, role_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT menu_id FROM role_menus WHERE role_id = $1")
                .bind(role_id)
                .fetch_all(&self.db)
                .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// 全量替换角色的菜单授权
    pub async fn set_role_menus(&self, role_id: Uuid, menu_ids: &[Uuid]) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        for menu_id in menu_ids {
            sqlx::query(
                "INSERT INTO role_menus (role_id, menu_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(role_id)
            .bind(menu_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// 获取一组角色可见的菜单（去重，仅激活且可见）
    pub async fn menus_for_roles(&self, role_ids: &[Uuid]) -> Result<Vec<Menu>, AppError> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let menus = sqlx::query_as::<_, Menu>(
            r#"
            SELECT DISTINCT m.*
            FROM menus m
            JOIN role_menus rm ON rm.menu_id = m.id
            WHERE rm.role_id = ANY($1) AND m.is_active AND m.visible
            ORDER BY m.sort_order, m.id
            "#,
        )
        .bind(role_ids.to_vec())
        .fetch_all(&self.db)
        .await?;

        Ok(menus)
    }
}
