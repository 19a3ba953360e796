//! Department repository (部门数据访问)

use crate::{
    error::AppError,
    models::department::*,
    models::scope::{DepartmentSet, ScopeDecision},
};
use sqlx::{PgPool, Row};
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

pub struct DepartmentRepository {
    db: PgPool,
}

impl DepartmentRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 列出所有部门（含停用）
    pub async fn list_all(&self) -> Result<Vec<Department>, AppError> {
        let departments = sqlx::query_as::<_, Department>(
            "SELECT * FROM departments ORDER BY sort_order, created_at",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(departments)
    }

    /// 按数据范围列出部门（部门表按 id 集合回退过滤）
    pub async fn list_scoped(&self, decision: &ScopeDecision) -> Result<Vec<Department>, AppError> {
        match &decision.departments {
            DepartmentSet::All => self.list_all().await,
            DepartmentSet::Ids(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }

                let ids: Vec<Uuid> = ids.iter().copied().collect();
                let departments = sqlx::query_as::<_, Department>(
                    r#"
                    SELECT * FROM departments
                    WHERE id = ANY($1)
                    ORDER BY sort_order, created_at
                    "#,
                )
                .bind(ids)
                .fetch_all(&self.db)
                .await?;

                Ok(departments)
            }
        }
    }

    /// 根据 ID 查找部门
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(department)
    }

    /// 加载内存部门树
    pub async fn load_tree(&self) -> Result<DepartmentTree, AppError> {
        let departments = self.list_all().await?;
        Ok(DepartmentTree::from_departments(&departments))
    }

    /// 创建部门，层级 = 上级层级 + 1（根部门为 1）
    pub async fn create(&self, req: &CreateDepartmentRequest) -> Result<Department, AppError> {
        let level = match req.parent_id {
            Some(parent_id) => {
                let parent = self
                    .find_by_id(&parent_id)
                    .await?
                    .ok_or_else(|| AppError::BadRequest("上级部门不存在".to_string()))?;
                parent.level + 1
            }
            None => 1,
        };

        let department = sqlx::query_as::<_, Department>(
            r#"
            INSERT INTO departments (name, code, parent_id, level, sort_order, leader)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.code)
        .bind(req.parent_id)
        .bind(level)
        .bind(req.sort_order.unwrap_or(0))
        .bind(&req.leader)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            AppError::map_unique_violation(e, AppError::BadRequest("部门编码已存在".to_string()))
        })?;

        Ok(department)
    }

    /// 更新部门基础信息（不含上级变更，见 reparent）
    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateDepartmentRequest,
    ) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<_, Department>(
            r#"
            UPDATE departments
            SET
                name = COALESCE($2, name),
                sort_order = COALESCE($3, sort_order),
                leader = COALESCE($4, leader),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(req.sort_order)
        .bind(&req.leader)
        .bind(req.is_active)
        .fetch_optional(&self.db)
        .await?;

        Ok(department)
    }

    /// 调整部门上级，并级联重算整棵子树的层级
    ///
    /// 原系统只更新节点自身的层级，子部门层级会悬空；这里一并修正。
    pub async fn reparent(
        &self,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> Result<Department, AppError> {
        let all = self.list_all().await?;
        let tree = DepartmentTree::from_departments(&all);

        if !tree.contains(id) {
            return Err(AppError::NotFound);
        }

        let new_level = match new_parent {
            Some(parent_id) => {
                if parent_id == id || tree.subtree(id).contains(&parent_id) {
                    return Err(AppError::BadRequest(
                        "不能把部门移动到自己或自己的子部门下".to_string(),
                    ));
                }
                let parent = tree
                    .get(parent_id)
                    .ok_or_else(|| AppError::BadRequest("上级部门不存在".to_string()))?;
                parent.level + 1
            }
            None => 1,
        };

        // 以新层级为起点，广度优先重算子树层级（带环保护）
        let mut updates = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut queue = VecDeque::from([(id, new_level)]);
        while let Some((current, level)) = queue.pop_front() {
            updates.push((current, level));
            for child in tree.children_unfiltered(current) {
                if visited.insert(child) {
                    queue.push_back((child, level + 1));
                }
            }
        }

        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE departments SET parent_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(new_parent)
            .execute(&mut *tx)
            .await?;

        for (dept_id, level) in updates {
            sqlx::query("UPDATE departments SET level = $2, updated_at = NOW() WHERE id = $1")
                .bind(dept_id)
                .bind(level)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.find_by_id(&id).await?.ok_or(AppError::NotFound)
    }

    /// 删除部门（存在子部门或成员时拒绝）
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let child_count: i64 =
            sqlx::query("SELECT COUNT(*) FROM departments WHERE parent_id = $1")
                .bind(id)
                .fetch_one(&self.db)
                .await?
                .get(0);

        if child_count > 0 {
            return Err(AppError::BadRequest("存在子部门，无法删除".to_string()));
        }

        let user_count: i64 = sqlx::query("SELECT COUNT(*) FROM users WHERE department_id = $1")
            .bind(id)
            .fetch_one(&self.db)
            .await?
            .get(0);

        if user_count > 0 {
            return Err(AppError::BadRequest("部门下存在用户，无法删除".to_string()));
        }

        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
