//! Per-route access decisions
//!
//! Authentication always runs before role evaluation: a route that requires
//! roles answers 401 for a bad credential even when no role could match.

use crate::{
    auth::{
        identity::{IdentityResolver, Principal},
        jwt::JwtService,
    },
    error::{AppError, AuthFailure},
    models::UserRole,
    repository::UserStore,
};
use std::{collections::HashSet, sync::Arc};

/// Access policy declared when a route is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// No credential needed; no principal is produced.
    Public,
    /// Caller must authenticate and hold one of these roles.
    /// An empty set admits any authenticated caller.
    Roles(HashSet<UserRole>),
}

impl AccessPolicy {
    pub fn authenticated() -> Self {
        AccessPolicy::Roles(HashSet::new())
    }

    pub fn roles<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = UserRole>,
    {
        AccessPolicy::Roles(roles.into_iter().collect())
    }

    pub fn admin() -> Self {
        Self::roles([UserRole::Admin])
    }

    pub fn staff() -> Self {
        Self::roles([UserRole::Admin, UserRole::Moderator])
    }

    pub fn any_role() -> Self {
        Self::roles([UserRole::Admin, UserRole::Moderator, UserRole::User])
    }
}

/// Role stage: set membership, no hierarchy.
pub fn check_roles(
    principal: Option<&Principal>,
    required: &HashSet<UserRole>,
) -> Result<(), AppError> {
    if required.is_empty() {
        return Ok(());
    }

    let principal = principal.ok_or(AppError::Unauthorized)?;
    if required.contains(&principal.role) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %principal.user_id,
            role = %principal.role,
            "Role not permitted for route"
        );
        Err(AppError::Forbidden)
    }
}

pub struct GuardChain {
    jwt: Arc<JwtService>,
    identity: IdentityResolver,
}

impl GuardChain {
    pub fn new(jwt: Arc<JwtService>, users: Arc<dyn UserStore>) -> Self {
        Self {
            jwt,
            identity: IdentityResolver::new(users),
        }
    }

    /// Verify then resolve.
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<Principal, AppError> {
        let token = credential.ok_or(AuthFailure::MissingCredential)?;
        let claims = self.jwt.verify(token)?;
        self.identity.resolve(&claims).await
    }

    /// Runs both stages for `policy`.
    ///
    /// Returns `Ok(None)` only for public routes.
    pub async fn authorize(
        &self,
        credential: Option<&str>,
        policy: &AccessPolicy,
    ) -> Result<Option<Principal>, AppError> {
        match policy {
            AccessPolicy::Public => Ok(None),
            AccessPolicy::Roles(required) => {
                let principal = self.authenticate(credential).await.map_err(|e| {
                    if let AppError::Authentication(reason) = &e {
                        tracing::debug!(reason = %reason, "Authentication rejected");
                    }
                    e
                })?;
                check_roles(Some(&principal), required)?;
                Ok(Some(principal))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::User, repository::InMemoryStore};
    use uuid::Uuid;

    const SECRET: &str = "test_secret_key_32_characters_long!";

    fn principal(role: UserRole) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            email: "p@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_check_roles_membership_without_hierarchy() {
        let admin_only = HashSet::from([UserRole::Admin]);
        let moderator = principal(UserRole::Moderator);
        let admin = principal(UserRole::Admin);

        assert!(check_roles(Some(&admin), &admin_only).is_ok());
        assert!(matches!(
            check_roles(Some(&moderator), &admin_only),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            check_roles(None, &admin_only),
            Err(AppError::Unauthorized)
        ));
        assert!(check_roles(None, &HashSet::new()).is_ok());
    }

    async fn chain_with(role: UserRole) -> (GuardChain, Arc<JwtService>, Arc<InMemoryStore>, User) {
        let store = Arc::new(InMemoryStore::new());
        let jwt = Arc::new(JwtService::new(SECRET, 600).unwrap());
        let user = User::new(
            "Gus".to_string(),
            "gus@example.com".to_string(),
            "hash".to_string(),
            role,
        );
        UserStore::create(store.as_ref(), &user).await.unwrap();
        (GuardChain::new(jwt.clone(), store.clone()), jwt, store, user)
    }

    #[tokio::test]
    async fn test_public_route_allows_anything() {
        let (chain, _jwt, _store, _user) = chain_with(UserRole::User).await;

        assert_eq!(chain.authorize(None, &AccessPolicy::Public).await.unwrap(), None);
        assert_eq!(
            chain
                .authorize(Some("garbage"), &AccessPolicy::Public)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_missing_credential_is_unauthorized() {
        let (chain, _jwt, _store, _user) = chain_with(UserRole::Admin).await;

        let err = chain.authorize(None, &AccessPolicy::admin()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Authentication(AuthFailure::MissingCredential)
        ));
        assert_eq!(err.code(), 401);
    }

    #[tokio::test]
    async fn test_bad_credential_is_401_even_when_role_cannot_match() {
        let (chain, _jwt, _store, _user) = chain_with(UserRole::User).await;

        let err = chain
            .authorize(Some("not.a.jwt"), &AccessPolicy::admin())
            .await
            .unwrap_err();
        assert_eq!(err.code(), 401);
    }

    #[tokio::test]
    async fn test_role_outside_set_is_forbidden() {
        let (chain, jwt, _store, user) = chain_with(UserRole::User).await;
        let token = jwt.generate_access_token(&user).unwrap();

        let err = chain
            .authorize(Some(&token), &AccessPolicy::staff())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn test_empty_role_set_admits_any_authenticated_user() {
        let (chain, jwt, _store, user) = chain_with(UserRole::User).await;
        let token = jwt.generate_access_token(&user).unwrap();

        let principal = chain
            .authorize(Some(&token), &AccessPolicy::authenticated())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.user_id, user.id);
    }

    #[tokio::test]
    async fn test_deleted_user_token_is_rejected() {
        let (chain, jwt, store, user) = chain_with(UserRole::Admin).await;
        let token = jwt.generate_access_token(&user).unwrap();
        UserStore::soft_delete(store.as_ref(), user.id).await.unwrap();

        let err = chain
            .authorize(Some(&token), &AccessPolicy::admin())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Authentication(AuthFailure::UserNotFoundOrDeleted)
        ));
    }
}
