//! Menu repository (菜单数据访问)

use crate::{error::AppError, models::menu::*};
use sqlx::PgPool;
use uuid::Uuid;

pub struct MenuRepository {
    db: PgPool,
}

impl MenuRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 列出所有菜单
    pub async fn list_all(&self) -> Result<Vec<Menu>, AppError> {
        let menus =
            sqlx::query_as::<_, Menu>("SELECT * FROM menus ORDER BY sort_order, created_at")
                .fetch_all(&self.db)
                .await?;

        Ok(menus)
    }

    /// 根据 ID 查找菜单
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<Menu>, AppError> {
        let menu = sqlx::query_as::<_, Menu>("SELECT * FROM menus WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(menu)
    }

    /// 创建菜单
    pub async fn create(&self, req: &CreateMenuRequest) -> Result<Menu, AppError> {
        let menu_type = req.menu_type.unwrap_or(MenuType::Menu);

        let menu = sqlx::query_as::<_, Menu>(
            r#"
            INSERT INTO menus
                (name, title, icon, path, component, menu_type, permission_code,
                 parent_id, sort_order, visible)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.title)
        .bind(&req.icon)
        .bind(&req.path)
        .bind(&req.component)
        .bind(menu_type)
        .bind(&req.permission_code)
        .bind(req.parent_id)
        .bind(req.sort_order.unwrap_or(0))
        .bind(req.visible.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        Ok(menu)
    }

    /// 更新菜单
    pub async fn update(&self, id: Uuid, req: &UpdateMenuRequest) -> Result<Option<Menu>, AppError> {
        let menu = sqlx::query_as::<_, Menu>(
            r#"
            UPDATE menus
            SET
                title = COALESCE($2, title),
                icon = COALESCE($3, icon),
                path = COALESCE($4, path),
                component = COALESCE($5, component),
                permission_code = COALESCE($6, permission_code),
                sort_order = COALESCE($7, sort_order),
                visible = COALESCE($8, visible),
                is_active = COALESCE($9, is_active)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.icon)
        .bind(&req.path)
        .bind(&req.component)
        .bind(&req.permission_code)
        .bind(req.sort_order)
        .bind(req.visible)
        .bind(req.is_active)
        .fetch_optional(&self.db)
        .await?;

        Ok(menu)
    }

    /// 删除菜单（子菜单和角色关联由外键级联删除）
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
