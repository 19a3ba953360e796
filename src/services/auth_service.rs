//! 认证服务：登录与令牌刷新

use crate::{
    auth::jwt::{JwtService, TokenPair},
    auth::password::PasswordHasher,
    error::AppError,
    models::user::*,
    repository::user_repo::UserRepository,
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub struct AuthService {
    db: PgPool,
    jwt_service: Arc<JwtService>,
}

impl AuthService {
    pub fn new(db: PgPool, jwt_service: Arc<JwtService>) -> Self {
        Self { db, jwt_service }
    }

    /// 用户登录
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        let user_repo = UserRepository::new(self.db.clone());

        // 获取用户
        let user: User = user_repo
            .find_by_username(&req.username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        // 检查账户状态
        if !user.is_active {
            tracing::warn!(username = %user.username, "Login attempt on disabled account");
            return Err(AppError::Unauthorized);
        }

        // 验证密码
        let hasher = PasswordHasher::new();
        hasher.verify(&req.password, &user.password_hash)?;

        // 记录登录时间（失败不影响登录流程）
        let _ = user_repo.update_last_login(user.id).await;

        // 生成令牌
        let token_pair =
            self.jwt_service
                .generate_token_pair(&user.id, &user.username, user.is_superuser)?;

        tracing::info!(username = %user.username, "User logged in");

        Ok(LoginResponse {
            access_token: token_pair.access_token,
            refresh_token: token_pair.refresh_token,
            expires_in: token_pair.expires_in,
            user: UserResponse::from(user),
        })
    }

    /// 刷新令牌
    pub async fn refresh_token(&self, req: RefreshTokenRequest) -> Result<TokenPair, AppError> {
        // 验证刷新令牌
        let claims = self.jwt_service.validate_refresh_token(&req.refresh_token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

        // 重新加载用户，签发时的状态可能已变化
        let user_repo = UserRepository::new(self.db.clone());
        let user: User = user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active {
            return Err(AppError::Unauthorized);
        }

        self.jwt_service
            .generate_token_pair(&user.id, &user.username, user.is_superuser)
    }

    /// 修改密码
    pub async fn change_password(
        &self,
        user_id: Uuid,
        req: &ChangePasswordRequest,
        config: &crate::config::AppConfig,
    ) -> Result<(), AppError> {
        let user_repo = UserRepository::new(self.db.clone());
        let user = user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let hasher = PasswordHasher::new();
        hasher.verify(&req.old_password, &user.password_hash)?;

        PasswordHasher::validate_password_policy(&req.new_password, config)?;

        let new_hash = hasher.hash(&req.new_password)?;
        user_repo.update_password(user_id, &new_hash).await?;

        Ok(())
    }
}
