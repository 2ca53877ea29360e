//! 认证服务：登录与当前用户

use crate::{
    auth::{identity::Principal, jwt::JwtService, password::PasswordHasher},
    error::{AppError, AuthFailure, NotFound, Result},
    models::{
        auth::{LoginRequest, LoginResponse},
        user::UserResponse,
    },
    repository::{Storage, UserStore},
};
use std::sync::Arc;
use validator::Validate;

const DUMMY_PASSWORD: &str = "unknown-account-placeholder";

pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_service: Arc<JwtService>,
    hasher: Arc<PasswordHasher>,
    /// 未知账号也做一次同参数的校验，使耗时与密码错误一致
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        storage: &Storage,
        jwt_service: Arc<JwtService>,
        hasher: Arc<PasswordHasher>,
    ) -> Result<Self> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            users: storage.users.clone(),
            jwt_service,
            hasher,
            dummy_hash,
        })
    }

    /// 用户登录
    ///
    /// Unknown email, deleted account and wrong password all answer the same.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse> {
        req.validate()
            .map_err(|_| AppError::from(AuthFailure::InvalidCredentials))?;

        let Some(user) = self.users.find_by_email(&req.email, false).await? else {
            let _ = self.hasher.verify(&req.password, &self.dummy_hash);
            tracing::info!("Login rejected: unknown or deleted account");
            return Err(AuthFailure::InvalidCredentials.into());
        };

        if let Err(e) = self.hasher.verify(&req.password, &user.password_hash) {
            tracing::info!(user_id = %user.id, error = %e, "Login rejected: password mismatch");
            return Err(AuthFailure::InvalidCredentials.into());
        }

        let access_token = self.jwt_service.generate_access_token(&user)?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(LoginResponse {
            access_token,
            expires_in: self.jwt_service.access_token_exp_secs(),
            user: user.into(),
        })
    }

    /// 获取当前用户信息
    pub async fn current_user(&self, principal: &Principal) -> Result<UserResponse> {
        self.users
            .find_by_id(principal.user_id, false)
            .await?
            .map(UserResponse::from)
            .ok_or(NotFound::User.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::models::user::UserRole;
    use argon2::Params;
    use std::time::{Duration, Instant};

    fn login(email: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: "wrong-password".to_string(),
        }
    }

    async fn timed(service: &AuthService, email: &str) -> Duration {
        let start = Instant::now();
        let err = service.login(login(email)).await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid credentials");
        start.elapsed()
    }

    #[tokio::test]
    async fn test_unknown_account_pays_for_hash_verification() {
        // 参数足够大，使一次校验远高于内存查找的耗时
        let hasher = Arc::new(PasswordHasher::with_params(
            Params::new(16 * 1024, 2, 1, None).unwrap(),
        ));
        let storage = Storage::in_memory();
        let user = User::new(
            "Known".to_string(),
            "known@example.com".to_string(),
            hasher.hash("right-password").unwrap(),
            UserRole::User,
        );
        storage.users.create(&user).await.unwrap();

        let jwt = Arc::new(JwtService::new("test-secret-key-for-testing-only-min-32-chars", 300).unwrap());
        let service = AuthService::new(&storage, jwt, hasher).unwrap();

        let known = timed(&service, "known@example.com").await;
        let unknown = timed(&service, "nobody@example.com").await;

        assert!(
            unknown * 4 >= known,
            "unknown account answered in {:?}, known in {:?}",
            unknown,
            known
        );
    }
}
