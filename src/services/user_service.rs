//! 用户管理服务

use crate::{
    auth::{identity::Principal, password::PasswordHasher},
    config::{PaginationConfig, SecurityConfig},
    error::{AppError, ConflictReason, NotFound, Result},
    models::user::{
        CreateUserRequest, PagedUsers, PaginationMeta, UpdateUserRequest, User, UserRole,
    },
    repository::{Storage, UserStore},
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const EMAIL_IN_USE: &str = "Email already in use";
const EMAIL_OF_DELETED: &str =
    "Email was previously used by a deleted account. Please contact support.";

pub struct UserService {
    users: Arc<dyn UserStore>,
    hasher: Arc<PasswordHasher>,
    password_min_length: usize,
    pagination: PaginationConfig,
}

impl UserService {
    pub fn new(
        storage: &Storage,
        hasher: Arc<PasswordHasher>,
        security: &SecurityConfig,
        pagination: &PaginationConfig,
    ) -> Self {
        Self {
            users: storage.users.clone(),
            hasher,
            password_min_length: security.password_min_length,
            pagination: pagination.clone(),
        }
    }

    pub async fn create(&self, req: CreateUserRequest) -> Result<User> {
        req.validate()?;
        PasswordHasher::validate_password_policy(&req.password, self.password_min_length)?;

        if let Some(existing) = self.users.find_by_email(&req.email, true).await? {
            let message = if existing.is_deleted() {
                EMAIL_OF_DELETED
            } else {
                EMAIL_IN_USE
            };
            return Err(ConflictReason::EmailTaken(message).into());
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let user = User::new(
            req.name,
            req.email,
            password_hash,
            req.role.unwrap_or(UserRole::User),
        );
        let user = self.users.create(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// 公开注册：只能创建 USER 账号
    pub async fn register(&self, req: CreateUserRequest) -> Result<User> {
        if req.role.is_some_and(|role| role != UserRole::User) {
            tracing::info!(email = %req.email, "Registration rejected: elevated role requested");
            return Err(AppError::Forbidden);
        }
        self.create(req).await
    }

    /// One page of users, newest first.
    pub async fn find_all(
        &self,
        include_deleted: bool,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<PagedUsers> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::BadRequest("page must be >= 1".to_string()));
        }

        let per_page = per_page.unwrap_or(self.pagination.default_per_page);
        if per_page < 1 {
            return Err(AppError::BadRequest("perPage must be >= 1".to_string()));
        }
        if per_page > self.pagination.max_per_page {
            return Err(AppError::BadRequest(format!(
                "perPage must be <= {}",
                self.pagination.max_per_page
            )));
        }

        let users = self.users.find_all(include_deleted, page, per_page).await?;
        let total = self.users.count(include_deleted).await?;

        Ok(PagedUsers {
            data: users.into_iter().map(Into::into).collect(),
            meta: PaginationMeta::new(total, page, per_page),
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<User> {
        self.users
            .find_by_id(id, false)
            .await?
            .ok_or(NotFound::User.into())
    }

    pub async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<User> {
        req.validate()?;
        let mut user = self.find_by_id(id).await?;

        if let Some(email) = req.email.as_deref().filter(|e| *e != user.email) {
            if let Some(other) = self.users.find_by_email(email, true).await? {
                if other.id != id {
                    return Err(ConflictReason::EmailTaken(EMAIL_IN_USE).into());
                }
            }
        }

        if let Some(name) = req.name {
            user.name = name;
        }
        if let Some(email) = req.email {
            user.email = email;
        }
        if let Some(role) = req.role {
            user.role = role;
        }
        if let Some(password) = req.password {
            PasswordHasher::validate_password_policy(&password, self.password_min_length)?;
            user.password_hash = self.hasher.hash(&password)?;
        }

        self.users.update(&user).await
    }

    /// Update on behalf of `actor`: self or ADMIN, and only ADMIN may change roles.
    pub async fn update_as(
        &self,
        actor: &Principal,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<User> {
        ensure_self_or_admin(actor, id)?;
        if req.role.is_some() && actor.role != UserRole::Admin {
            tracing::info!(user_id = %actor.user_id, target = %id, "Role change rejected");
            return Err(AppError::Forbidden);
        }
        self.update(id, req).await
    }

    pub async fn soft_delete_as(&self, actor: &Principal, id: Uuid) -> Result<()> {
        ensure_self_or_admin(actor, id)?;
        self.soft_delete(id).await
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.find_by_id(id).await?;
        self.users.soft_delete(id).await?;
        tracing::info!(user_id = %id, "User soft-deleted");
        Ok(())
    }

    pub async fn restore(&self, id: Uuid) -> Result<User> {
        let user = self
            .users
            .find_by_id(id, true)
            .await?
            .ok_or(AppError::NotFound(NotFound::User))?;
        if !user.is_deleted() {
            return Err(ConflictReason::NotDeleted { entity: "User" }.into());
        }

        let user = self.users.restore(id).await?;
        tracing::info!(user_id = %id, "User restored");
        Ok(user)
    }

    pub async fn hard_delete(&self, id: Uuid) -> Result<()> {
        if self.users.find_by_id(id, true).await?.is_none() {
            return Err(NotFound::User.into());
        }
        self.users.delete(id).await?;
        tracing::info!(user_id = %id, "User permanently deleted");
        Ok(())
    }

    /// Seeds an administrator when no account (live or deleted) holds `email`.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> Result<User> {
        if let Some(existing) = self.users.find_by_email(email, true).await? {
            tracing::debug!(user_id = %existing.id, "Bootstrap admin already present");
            return Ok(existing);
        }

        let user = User::new(
            name.to_string(),
            email.to_string(),
            self.hasher.hash(password)?,
            UserRole::Admin,
        );
        let user = self.users.create(&user).await?;
        tracing::info!(user_id = %user.id, "Bootstrap admin created");
        Ok(user)
    }
}

fn ensure_self_or_admin(actor: &Principal, id: Uuid) -> Result<()> {
    if actor.user_id == id || actor.role == UserRole::Admin {
        Ok(())
    } else {
        tracing::info!(user_id = %actor.user_id, target = %id, "Account change rejected: not owner");
        Err(AppError::Forbidden)
    }
}
