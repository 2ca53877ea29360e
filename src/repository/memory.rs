//! In-process storage
//!
//! Backs the `memory` storage backend and the test suite. Each table is a
//! `HashMap` behind a tokio `RwLock`; scans return rows oldest first.

use super::{EnvironmentPermissionStore, RoleAssignmentStore, RoleStore, UserStore};
use crate::{
    error::{AppError, Result},
    models::{EnvironmentPermission, Role, RoleAssignment, User},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

trait Record: Clone + Send + Sync {
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn set_deleted_at(&mut self, deleted_at: Option<DateTime<Utc>>);
    fn touch(&mut self, now: DateTime<Utc>);
}

macro_rules! impl_record {
    ($ty:ty, $entity:literal) => {
        impl Record for $ty {
            const ENTITY: &'static str = $entity;

            fn id(&self) -> Uuid {
                self.id
            }
            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
            fn deleted_at(&self) -> Option<DateTime<Utc>> {
                self.deleted_at
            }
            fn set_deleted_at(&mut self, deleted_at: Option<DateTime<Utc>>) {
                self.deleted_at = deleted_at;
            }
            fn touch(&mut self, now: DateTime<Utc>) {
                self.updated_at = now;
            }
        }
    };
}

impl_record!(User, "User");
impl_record!(Role, "Role");
impl_record!(EnvironmentPermission, "Environment permission");
impl_record!(RoleAssignment, "Role assignment");

struct Table<T> {
    rows: RwLock<HashMap<Uuid, T>>,
}

impl<T: Record> Table<T> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    async fn insert(&self, row: &T) -> Result<T> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&row.id()) {
            return Err(AppError::internal_error("duplicate primary key"));
        }
        rows.insert(row.id(), row.clone());
        Ok(row.clone())
    }

    async fn get(&self, id: Uuid, include_deleted: bool) -> Option<T> {
        self.rows
            .read()
            .await
            .get(&id)
            .filter(|row| include_deleted || row.deleted_at().is_none())
            .cloned()
    }

    async fn scan<F>(&self, include_deleted: bool, matches: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut out: Vec<T> = self
            .rows
            .read()
            .await
            .values()
            .filter(|row| include_deleted || row.deleted_at().is_none())
            .filter(|row| matches(row))
            .cloned()
            .collect();
        out.sort_by_key(|row| (row.created_at(), row.id()));
        out
    }

    async fn replace(&self, row: &T) -> Result<T> {
        let mut rows = self.rows.write().await;
        let slot = rows.get_mut(&row.id()).ok_or(AppError::not_found(T::ENTITY))?;
        let mut updated = row.clone();
        // 删除标记只能通过 soft_delete / restore 修改
        updated.set_deleted_at(slot.deleted_at());
        updated.touch(Utc::now());
        *slot = updated.clone();
        Ok(updated)
    }

    async fn mark_deleted(&self, id: Uuid, deleted_at: Option<DateTime<Utc>>) -> Result<T> {
        let mut rows = self.rows.write().await;
        let slot = rows.get_mut(&id).ok_or(AppError::not_found(T::ENTITY))?;
        let now = Utc::now();
        slot.set_deleted_at(deleted_at);
        slot.touch(now);
        Ok(slot.clone())
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::not_found(T::ENTITY))
    }
}

/// All four stores over in-process tables.
pub struct InMemoryStore {
    users: Table<User>,
    roles: Table<Role>,
    environment_permissions: Table<EnvironmentPermission>,
    role_assignments: Table<RoleAssignment>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: Table::new(),
            roles: Table::new(),
            environment_permissions: Table::new(),
            role_assignments: Table::new(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create(&self, user: &User) -> Result<User> {
        self.users.insert(user).await
    }

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<User>> {
        Ok(self.users.get(id, include_deleted).await)
    }

    async fn find_by_email(&self, email: &str, include_deleted: bool) -> Result<Option<User>> {
        Ok(self
            .users
            .scan(include_deleted, |u| u.email == email)
            .await
            .into_iter()
            .next())
    }

    async fn find_all(&self, include_deleted: bool, page: u32, per_page: u32) -> Result<Vec<User>> {
        let mut users = self.users.scan(include_deleted, |_| true).await;
        users.reverse();

        let offset = (page.saturating_sub(1) as usize).saturating_mul(per_page as usize);
        Ok(users.into_iter().skip(offset).take(per_page as usize).collect())
    }

    async fn count(&self, include_deleted: bool) -> Result<u64> {
        Ok(self.users.scan(include_deleted, |_| true).await.len() as u64)
    }

    async fn update(&self, user: &User) -> Result<User> {
        self.users.replace(user).await
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.users.mark_deleted(id, Some(Utc::now())).await.map(|_| ())
    }

    async fn restore(&self, id: Uuid) -> Result<User> {
        self.users.mark_deleted(id, None).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.users.remove(id).await
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn create(&self, role: &Role) -> Result<Role> {
        self.roles.insert(role).await
    }

    async fn find_all(&self, include_deleted: bool) -> Result<Vec<Role>> {
        Ok(self.roles.scan(include_deleted, |_| true).await)
    }

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<Role>> {
        Ok(self.roles.get(id, include_deleted).await)
    }

    async fn find_by_name(&self, name: &str, include_deleted: bool) -> Result<Option<Role>> {
        Ok(self
            .roles
            .scan(include_deleted, |r| r.name == name)
            .await
            .into_iter()
            .next())
    }

    async fn find_active(&self) -> Result<Vec<Role>> {
        Ok(self.roles.scan(false, |r| r.active).await)
    }

    async fn update(&self, role: &Role) -> Result<Role> {
        self.roles.replace(role).await
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.roles.mark_deleted(id, Some(Utc::now())).await.map(|_| ())
    }

    async fn restore(&self, id: Uuid) -> Result<()> {
        self.roles.mark_deleted(id, None).await.map(|_| ())
    }

    async fn hard_delete(&self, id: Uuid) -> Result<()> {
        self.roles.remove(id).await
    }
}

#[async_trait]
impl EnvironmentPermissionStore for InMemoryStore {
    async fn create(&self, permission: &EnvironmentPermission) -> Result<EnvironmentPermission> {
        self.environment_permissions.insert(permission).await
    }

    async fn find_all(&self, include_deleted: bool) -> Result<Vec<EnvironmentPermission>> {
        Ok(self.environment_permissions.scan(include_deleted, |_| true).await)
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> Result<Option<EnvironmentPermission>> {
        Ok(self.environment_permissions.get(id, include_deleted).await)
    }

    async fn find_by_name(
        &self,
        name: &str,
        include_deleted: bool,
    ) -> Result<Option<EnvironmentPermission>> {
        Ok(self
            .environment_permissions
            .scan(include_deleted, |p| p.name == name)
            .await
            .into_iter()
            .next())
    }

    async fn find_by_profile(
        &self,
        profile: &str,
        include_deleted: bool,
    ) -> Result<Vec<EnvironmentPermission>> {
        Ok(self
            .environment_permissions
            .scan(include_deleted, |p| p.profile == profile)
            .await)
    }

    async fn update(&self, permission: &EnvironmentPermission) -> Result<EnvironmentPermission> {
        self.environment_permissions.replace(permission).await
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.environment_permissions
            .mark_deleted(id, Some(Utc::now()))
            .await
            .map(|_| ())
    }

    async fn restore(&self, id: Uuid) -> Result<()> {
        self.environment_permissions.mark_deleted(id, None).await.map(|_| ())
    }

    async fn hard_delete(&self, id: Uuid) -> Result<()> {
        self.environment_permissions.remove(id).await
    }
}

#[async_trait]
impl RoleAssignmentStore for InMemoryStore {
    async fn create(&self, assignment: &RoleAssignment) -> Result<RoleAssignment> {
        self.role_assignments.insert(assignment).await
    }

    async fn find_all(&self, include_deleted: bool) -> Result<Vec<RoleAssignment>> {
        Ok(self.role_assignments.scan(include_deleted, |_| true).await)
    }

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<RoleAssignment>> {
        Ok(self.role_assignments.get(id, include_deleted).await)
    }

    async fn find_by_user_id(
        &self,
        user_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<RoleAssignment>> {
        Ok(self
            .role_assignments
            .scan(include_deleted, |a| a.user_id == user_id)
            .await)
    }

    async fn find_by_granted_by(
        &self,
        granted_by: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<RoleAssignment>> {
        Ok(self
            .role_assignments
            .scan(include_deleted, |a| a.granted_by == granted_by)
            .await)
    }

    async fn update(&self, assignment: &RoleAssignment) -> Result<RoleAssignment> {
        self.role_assignments.replace(assignment).await
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.role_assignments
            .mark_deleted(id, Some(Utc::now()))
            .await
            .map(|_| ())
    }

    async fn restore(&self, id: Uuid) -> Result<()> {
        self.role_assignments.mark_deleted(id, None).await.map(|_| ())
    }

    async fn hard_delete(&self, id: Uuid) -> Result<()> {
        self.role_assignments.remove(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{role::CreateRoleRequest, UserRole};

    fn role(name: &str) -> Role {
        Role::new(CreateRoleRequest {
            name: name.to_string(),
            description: "A role used in tests".to_string(),
            access_areas: vec![],
            active: None,
        })
    }

    #[tokio::test]
    async fn test_soft_deleted_rows_hidden_by_default() {
        let store = InMemoryStore::new();
        let r = RoleStore::create(&store, &role("Reviewer")).await.unwrap();

        RoleStore::soft_delete(&store, r.id).await.unwrap();

        assert!(RoleStore::find_by_id(&store, r.id, false).await.unwrap().is_none());
        let deleted = RoleStore::find_by_id(&store, r.id, true).await.unwrap().unwrap();
        assert!(deleted.deleted_at.is_some());
        assert!(RoleStore::find_by_name(&store, "Reviewer", false)
            .await
            .unwrap()
            .is_none());
        assert_eq!(RoleStore::find_all(&store, true).await.unwrap().len(), 1);
        assert!(RoleStore::find_all(&store, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_clears_stamp() {
        let store = InMemoryStore::new();
        let r = RoleStore::create(&store, &role("Reviewer")).await.unwrap();

        RoleStore::soft_delete(&store, r.id).await.unwrap();
        RoleStore::restore(&store, r.id).await.unwrap();

        let restored = RoleStore::find_by_id(&store, r.id, false).await.unwrap().unwrap();
        assert!(restored.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_update_does_not_touch_deleted_at() {
        let store = InMemoryStore::new();
        let mut r = RoleStore::create(&store, &role("Reviewer")).await.unwrap();
        RoleStore::soft_delete(&store, r.id).await.unwrap();

        r.description = "Changed while deleted".to_string();
        let updated = RoleStore::update(&store, &r).await.unwrap();
        assert!(updated.deleted_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_rows_report_not_found() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();

        assert!(matches!(
            RoleStore::hard_delete(&store, id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            RoleAssignmentStore::soft_delete(&store, id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_user_pages_newest_first() {
        let store = InMemoryStore::new();
        for i in 0..3 {
            let mut user = User::new(
                format!("user{i}"),
                format!("user{i}@example.com"),
                "hash".to_string(),
                UserRole::User,
            );
            user.created_at = Utc::now() + chrono::Duration::seconds(i);
            UserStore::create(&store, &user).await.unwrap();
        }

        let first = UserStore::find_all(&store, false, 1, 2).await.unwrap();
        let second = UserStore::find_all(&store, false, 2, 2).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first[0].name, "user2");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "user0");
        assert_eq!(UserStore::count(&store, false).await.unwrap(), 3);
    }
}
