//! User account operations.
//!
//! Every operation that touches an existing account takes the calling
//! [`Principal`] explicitly and evaluates policy before storage:
//! - listing is admin-only
//! - single-account operations apply the ownership rule (own account or
//!   admin), and the denial is reported even when the target id does not
//!   exist
//!
//! Assignment mutations against one user are serialized through a per-user
//! async lock so two concurrent calls cannot read the same assignment
//! snapshot and clobber each other.

pub mod model;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::auth::{password, Principal};
use crate::error::{AppError, ErrorBoundary, Result};
use crate::rbac::{check_ownership, require_role, OwnedAction, Role};
use crate::store::{ServiceStore, UserStore};

pub use model::{NewUser, User, UserChanges};

pub struct UserService {
    users: Arc<dyn UserStore>,
    catalog: Arc<dyn ServiceStore>,
    user_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, catalog: Arc<dyn ServiceStore>) -> Self {
        Self {
            users,
            catalog,
            user_locks: DashMap::new(),
        }
    }

    /// Locks are created lazily on first assignment mutation and evicted
    /// on soft delete, so the registry stays bounded by the live user
    /// count. A restored user simply gets a fresh lock.
    fn lock_for(&self, user_id: i64) -> Arc<Mutex<()>> {
        self.user_locks.entry(user_id).or_default().clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // CRUD
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new account. Open to unauthenticated callers; the
    /// password is hashed before it reaches storage.
    pub async fn create(
        &self,
        name: String,
        email: String,
        plaintext: &str,
        role: Role,
    ) -> Result<User> {
        let inner = async {
            let digest = password::hash(plaintext)?;
            let user = self
                .users
                .insert(NewUser {
                    name,
                    email,
                    password: digest,
                    role,
                })
                .await?;
            info!(user_id = user.id, "user created");
            Ok(user)
        };
        inner.await.or_internal("Error creating user")
    }

    /// List all accounts with their assigned services. Admin only.
    pub async fn find_all(&self, principal: &Principal) -> Result<Vec<User>> {
        let inner = async {
            require_role(principal, &[Role::Admin])?;
            self.users.find_all().await
        };
        inner.await.or_internal("Error fetching users")
    }

    pub async fn find_one(&self, principal: &Principal, id: i64) -> Result<User> {
        let inner = async {
            check_ownership(principal, id, OwnedAction::Search)?;
            self.users
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("User with ID {id} not found")))
        };
        inner.await.or_internal("Error fetching the user")
    }

    /// Apply a partial update. Reports success whether or not the target
    /// row existed; callers that need existence guarantees fetch first.
    pub async fn update(
        &self,
        principal: &Principal,
        id: i64,
        changes: UserChanges,
    ) -> Result<String> {
        let inner = async {
            check_ownership(principal, id, OwnedAction::Update)?;
            self.users.update(id, changes).await?;
            Ok("User updated successfully".to_string())
        };
        inner.await.or_internal("Error updating user")
    }

    pub async fn soft_delete(&self, principal: &Principal, id: i64) -> Result<String> {
        let inner = async {
            check_ownership(principal, id, OwnedAction::Delete)?;
            let affected = self.users.soft_delete(id).await?;
            if affected == 0 {
                return Err(AppError::not_found(format!("User with ID {id} not found")));
            }
            self.user_locks.remove(&id);
            info!(user_id = id, "user soft deleted");
            Ok("User deleted successfully".to_string())
        };
        inner.await.or_internal("Error deleting user")
    }

    pub async fn restore(&self, principal: &Principal, id: i64) -> Result<String> {
        let inner = async {
            check_ownership(principal, id, OwnedAction::Restore)?;
            let affected = self.users.restore(id).await?;
            if affected == 0 {
                return Err(AppError::not_found(format!(
                    "User with ID {id} not found or not soft deleted."
                )));
            }
            info!(user_id = id, "user restored");
            Ok("User restored successfully".to_string())
        };
        inner.await.or_internal("Error restoring user")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Service assignment
    // ─────────────────────────────────────────────────────────────────────────

    /// Assign a catalog service to a user's set.
    ///
    /// Ownership is checked before either record is loaded, then the
    /// user's lock is held across the read-check-write so concurrent
    /// assignment mutations serialize.
    pub async fn assign_service(
        &self,
        principal: &Principal,
        user_id: i64,
        service_id: i64,
    ) -> Result<String> {
        let inner = async {
            check_ownership(principal, user_id, OwnedAction::AssignServices)?;

            let lock = self.lock_for(user_id);
            let _guard = lock.lock().await;

            let user = self
                .users
                .find_by_id(user_id)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(format!("User with ID {user_id} not found"))
                })?;
            let service = self
                .catalog
                .find_by_id(service_id)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(format!("Service with ID {service_id} not found."))
                })?;

            if user.services.iter().any(|s| s.id == service_id) {
                return Err(AppError::forbidden(format!(
                    "{} service is already assigned",
                    service.name
                )));
            }

            self.users.add_assignment(user_id, service_id).await?;
            info!(user_id, service_id, "service assigned");
            Ok(format!(
                "{} service has been assigned to user services",
                service.name
            ))
        };
        inner.await.or_internal("Error assigning service to user")
    }

    /// Remove a catalog service from a user's set. The service must still
    /// exist as a global resource even when unassigned.
    pub async fn remove_service(
        &self,
        principal: &Principal,
        user_id: i64,
        service_id: i64,
    ) -> Result<String> {
        let inner = async {
            check_ownership(principal, user_id, OwnedAction::RemoveServices)?;

            let lock = self.lock_for(user_id);
            let _guard = lock.lock().await;

            let user = self
                .users
                .find_by_id(user_id)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(format!("User with ID {user_id} not found"))
                })?;
            let service = self
                .catalog
                .find_by_id(service_id)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(format!("Service with ID {service_id} not found."))
                })?;

            if !user.services.iter().any(|s| s.id == service_id) {
                return Err(AppError::not_found(format!(
                    "{} service is not assigned to your services",
                    service.name
                )));
            }

            self.users.remove_assignment(user_id, service_id).await?;
            info!(user_id, service_id, "service removed");
            Ok(format!(
                "{} service has been removed from user services",
                service.name
            ))
        };
        inner.await.or_internal("Error removing service from user")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::{NewService, ServiceCategory};
    use crate::store::InMemoryStore;

    fn owner(id: i64) -> Principal {
        Principal { id, role: Role::User }
    }

    fn admin(id: i64) -> Principal {
        Principal { id, role: Role::Admin }
    }

    fn service() -> (Arc<InMemoryStore>, UserService) {
        let store = Arc::new(InMemoryStore::new());
        let users = UserService::new(store.clone(), store.clone());
        (store, users)
    }

    async fn seed_user(users: &UserService, email: &str) -> User {
        users
            .create("Test".to_string(), email.to_string(), "Password1!", Role::User)
            .await
            .unwrap()
    }

    async fn seed_catalog(store: &InMemoryStore, name: &str) -> i64 {
        ServiceStore::insert(
            store,
            NewService {
                name: name.to_string(),
                description: "A service".to_string(),
                cost: 120.0,
                category: ServiceCategory::Home,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn create_hashes_the_password() {
        let (_, users) = service();
        let user = seed_user(&users, "a@test.com").await;
        assert_ne!(user.password, "Password1!");
        assert!(password::verify("Password1!", &user.password).unwrap());
    }

    #[tokio::test]
    async fn listing_requires_admin() {
        let (_, users) = service();
        seed_user(&users, "a@test.com").await;

        let err = users.find_all(&owner(1)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let all = users.find_all(&admin(99)).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn ownership_denial_precedes_existence() {
        let (_, users) = service();
        // Target id 42 does not exist; the non-owner still sees Forbidden.
        let err = users.find_one(&owner(1), 42).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert_eq!(err.user_message(), "You can only search your own account");

        let err = users.find_one(&owner(42), 42).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn update_reports_success_without_existence_check() {
        let (_, users) = service();
        let message = users
            .update(&owner(42), 42, UserChanges::default())
            .await
            .unwrap();
        assert_eq!(message, "User updated successfully");
    }

    #[tokio::test]
    async fn delete_and_restore_messages() {
        let (_, users) = service();
        let user = seed_user(&users, "a@test.com").await;
        let principal = owner(user.id);

        let err = users.restore(&principal, user.id).await.unwrap_err();
        assert_eq!(
            err.user_message(),
            format!("User with ID {} not found or not soft deleted.", user.id)
        );

        let message = users.soft_delete(&principal, user.id).await.unwrap();
        assert_eq!(message, "User deleted successfully");

        let err = users.soft_delete(&principal, user.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(
            err.user_message(),
            format!("User with ID {} not found", user.id)
        );

        let message = users.restore(&principal, user.id).await.unwrap();
        assert_eq!(message, "User restored successfully");
    }

    #[tokio::test]
    async fn assign_then_duplicate_then_remove() {
        let (store, users) = service();
        let user = seed_user(&users, "a@test.com").await;
        let gardening = seed_catalog(&store, "Gardening").await;
        let principal = owner(user.id);

        let message = users
            .assign_service(&principal, user.id, gardening)
            .await
            .unwrap();
        assert_eq!(message, "Gardening service has been assigned to user services");

        let err = users
            .assign_service(&principal, user.id, gardening)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert_eq!(err.user_message(), "Gardening service is already assigned");

        let message = users
            .remove_service(&principal, user.id, gardening)
            .await
            .unwrap();
        assert_eq!(message, "Gardening service has been removed from user services");

        let err = users
            .remove_service(&principal, user.id, gardening)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(
            err.user_message(),
            "Gardening service is not assigned to your services"
        );
    }

    #[tokio::test]
    async fn assign_reports_missing_user_and_service() {
        let (store, users) = service();
        let gardening = seed_catalog(&store, "Gardening").await;

        let err = users
            .assign_service(&admin(9), 42, gardening)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "User with ID 42 not found");

        let user = seed_user(&users, "a@test.com").await;
        let err = users
            .assign_service(&admin(9), user.id, 999)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Service with ID 999 not found.");
    }

    #[tokio::test]
    async fn soft_delete_evicts_the_users_lock() {
        let (store, users) = service();
        let user = seed_user(&users, "a@test.com").await;
        let gardening = seed_catalog(&store, "Gardening").await;
        let principal = owner(user.id);

        users
            .assign_service(&principal, user.id, gardening)
            .await
            .unwrap();
        assert!(users.user_locks.contains_key(&user.id));

        users.soft_delete(&principal, user.id).await.unwrap();
        assert!(!users.user_locks.contains_key(&user.id));

        // A restored user gets a fresh lock on the next mutation.
        users.restore(&principal, user.id).await.unwrap();
        users
            .remove_service(&principal, user.id, gardening)
            .await
            .unwrap();
        assert!(users.user_locks.contains_key(&user.id));
    }

    #[tokio::test]
    async fn concurrent_assigns_both_land() {
        let (store, users) = service();
        let users = Arc::new(users);
        let user = seed_user(&users, "a@test.com").await;
        let first = seed_catalog(&store, "Gardening").await;
        let second = seed_catalog(&store, "Tutoring").await;

        let a = {
            let users = users.clone();
            let principal = owner(user.id);
            tokio::spawn(async move { users.assign_service(&principal, user.id, first).await })
        };
        let b = {
            let users = users.clone();
            let principal = owner(user.id);
            tokio::spawn(async move { users.assign_service(&principal, user.id, second).await })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let loaded = users.find_one(&owner(user.id), user.id).await.unwrap();
        assert_eq!(loaded.services.len(), 2);
    }
}
