//! Resolves verified claims to the caller's current identity.

use crate::{
    auth::jwt::Claims,
    error::{AppError, AuthFailure},
    models::{User, UserRole},
    repository::UserStore,
};
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated caller, request-scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

pub struct IdentityResolver {
    users: Arc<dyn UserStore>,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Looks up the live user named by `claims.sub`.
    ///
    /// The principal carries the role stored now, not the role in the token.
    pub async fn resolve(&self, claims: &Claims) -> Result<Principal, AppError> {
        let user_id = claims.user_id()?;

        match self.users.find_by_id(user_id, false).await? {
            Some(user) => Ok(Principal::from(&user)),
            None => {
                tracing::debug!(user_id = %user_id, "Token subject not found or deleted");
                Err(AuthFailure::UserNotFoundOrDeleted.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;

    fn claims_for(user: &User, role: &str) -> Claims {
        Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: role.to_string(),
            iat: 0,
            exp: i64::MAX,
        }
    }

    async fn setup() -> (Arc<InMemoryStore>, IdentityResolver, User) {
        let store = Arc::new(InMemoryStore::new());
        let user = User::new(
            "Una".to_string(),
            "una@example.com".to_string(),
            "hash".to_string(),
            UserRole::User,
        );
        UserStore::create(store.as_ref(), &user).await.unwrap();
        let resolver = IdentityResolver::new(store.clone());
        (store, resolver, user)
    }

    #[tokio::test]
    async fn test_resolves_live_user_with_stored_role() {
        let (_store, resolver, user) = setup().await;

        // 令牌中的角色不可信，以存储为准
        let principal = resolver.resolve(&claims_for(&user, "ADMIN")).await.unwrap();
        assert_eq!(principal.user_id, user.id);
        assert_eq!(principal.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_rejects_deleted_user() {
        let (store, resolver, user) = setup().await;
        UserStore::soft_delete(store.as_ref(), user.id).await.unwrap();

        let err = resolver.resolve(&claims_for(&user, "USER")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Authentication(AuthFailure::UserNotFoundOrDeleted)
        ));
    }

    #[tokio::test]
    async fn test_rejects_unknown_user() {
        let (_store, resolver, _user) = setup().await;
        let ghost = User::new(
            "Ghost".to_string(),
            "ghost@example.com".to_string(),
            "hash".to_string(),
            UserRole::Admin,
        );

        let err = resolver.resolve(&claims_for(&ghost, "ADMIN")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Authentication(AuthFailure::UserNotFoundOrDeleted)
        ));
    }
}
