//! Article repository (业务示例的数据访问)
//!
//! 列表与详情查询都经过行级谓词过滤，谓词由调用方基于数据范围决策构建。

use crate::{
    error::AppError,
    models::article::*,
    models::scope::RowPredicate,
    models::user::User,
};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

/// 受控实体默认的创建人列名
const OWNER_FIELD: &str = "created_by";

pub struct ArticleRepository {
    db: PgPool,
}

impl ArticleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 按行级谓词列出文章
    pub async fn list(
        &self,
        predicate: &RowPredicate,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Article>, AppError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT * FROM articles WHERE ");
        predicate.push_sql(&mut qb, OWNER_FIELD);
        qb.push(" ORDER BY created_at DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let articles = qb.build_query_as::<Article>().fetch_all(&self.db).await?;

        Ok(articles)
    }

    /// 按行级谓词统计文章数量
    pub async fn count(&self, predicate: &RowPredicate) -> Result<i64, AppError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM articles WHERE ");
        predicate.push_sql(&mut qb, OWNER_FIELD);

        let count: i64 = qb.build().fetch_one(&self.db).await?.get(0);

        Ok(count)
    }

    /// 查找单篇文章并套用行级谓词，越权访问表现为 NotFound
    pub async fn find_scoped(
        &self,
        id: Uuid,
        predicate: &RowPredicate,
    ) -> Result<Option<Article>, AppError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT * FROM articles WHERE id = ");
        qb.push_bind(id);
        qb.push(" AND ");
        predicate.push_sql(&mut qb, OWNER_FIELD);

        let article = qb
            .build_query_as::<Article>()
            .fetch_optional(&self.db)
            .await?;

        Ok(article)
    }

    /// 创建文章；未指定所属部门时默认为创建人的部门
    pub async fn create(
        &self,
        req: &CreateArticleRequest,
        creator: &User,
    ) -> Result<Article, AppError> {
        let owner_department = req.owner_department_id.or(creator.department_id);

        let article = sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles
                (title, content, category, status, created_by, updated_by,
                 owner_department_id, is_public, data_level)
            VALUES ($1, $2, $3, $4, $5, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&req.title)
        .bind(req.content.as_deref().unwrap_or(""))
        .bind(req.category.as_deref().unwrap_or(""))
        .bind(req.status.as_deref().unwrap_or("draft"))
        .bind(creator.id)
        .bind(owner_department)
        .bind(req.is_public.unwrap_or(false))
        .bind(req.data_level.unwrap_or(2))
        .fetch_one(&self.db)
        .await?;

        Ok(article)
    }

    /// 更新文章
    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateArticleRequest,
        updated_by: Uuid,
    ) -> Result<Option<Article>, AppError> {
        let article = sqlx::query_as::<_, Article>(
            r#"
            UPDATE articles
            SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                category = COALESCE($4, category),
                status = COALESCE($5, status),
                is_public = COALESCE($6, is_public),
                data_level = COALESCE($7, data_level),
                updated_by = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(&req.category)
        .bind(&req.status)
        .bind(req.is_public)
        .bind(req.data_level)
        .bind(updated_by)
        .fetch_optional(&self.db)
        .await?;

        Ok(article)
    }

    /// 删除文章
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
