//! 数据范围解析服务
//!
//! 负责把存储里的用户、角色、部门数据装配成纯函数 resolve_scope 的输入，
//! 解析与谓词构建本身不碰数据库。

use crate::{
    error::AppError,
    models::department::DepartmentTree,
    models::scope::{build_predicate, resolve_scope, RowPredicate, ScopeDecision},
    models::user::{CurrentUser, User},
    repository::{department_repo::DepartmentRepository, role_repo::RoleRepository, user_repo::UserRepository},
};
use sqlx::PgPool;
use uuid::Uuid;

pub struct ScopeService {
    db: PgPool,
}

impl ScopeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 解析指定用户的有效数据范围
    pub async fn resolve_for(&self, user: &User) -> Result<ScopeDecision, AppError> {
        let subject = CurrentUser::from_user(user);

        // 超级用户不需要加载角色与部门树
        if subject.is_superuser {
            return Ok(resolve_scope(&subject, &[], &DepartmentTree::default()));
        }

        let role_repo = RoleRepository::new(self.db.clone());
        let role_scopes = role_repo.scopes_for_user(user.id).await?;

        let dept_repo = DepartmentRepository::new(self.db.clone());
        let tree = dept_repo.load_tree().await?;

        let decision = resolve_scope(&subject, &role_scopes, &tree);

        tracing::debug!(
            username = %user.username,
            scope = decision.scope.as_i16(),
            "Data scope resolved"
        );

        Ok(decision)
    }

    /// 加载用户并解析其数据范围
    pub async fn resolve(&self, user_id: Uuid) -> Result<(User, ScopeDecision), AppError> {
        let user_repo = UserRepository::new(self.db.clone());
        let user = user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let decision = self.resolve_for(&user).await?;
        Ok((user, decision))
    }

    /// 加载用户并构建受控实体的行级谓词
    pub async fn predicate(&self, user_id: Uuid) -> Result<(User, RowPredicate), AppError> {
        let (user, decision) = self.resolve(user_id).await?;
        let predicate = build_predicate(&decision, &CurrentUser::from_user(&user));
        Ok((user, predicate))
    }
}
