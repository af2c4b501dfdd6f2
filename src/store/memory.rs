//! In-memory store for tests and development.
//!
//! Mirrors the Postgres backend's visibility rules: soft-deleted rows are
//! excluded from lookups, restore only touches deleted rows, and loaded
//! assignment sets skip soft-deleted services.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};

use crate::error::{AppError, ErrorCode, Result};
use crate::services::{NewService, Service, ServiceChanges};
use crate::users::{NewUser, User, UserChanges};

use super::{ServiceStore, UserStore};

#[derive(Default)]
pub struct InMemoryStore {
    users: DashMap<i64, User>,
    services: DashMap<i64, Service>,
    assignments: DashSet<(i64, i64)>,
    next_user_id: AtomicI64,
    next_service_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn services_of(&self, user_id: i64) -> Vec<Service> {
        let mut services: Vec<Service> = self
            .assignments
            .iter()
            .filter(|pair| pair.0 == user_id)
            .filter_map(|pair| self.services.get(&pair.1).map(|s| s.value().clone()))
            .filter(|s| s.deleted_at.is_none())
            .collect();
        services.sort_by_key(|s| s.id);
        services
    }

    fn with_services(&self, user: &User) -> User {
        let mut user = user.clone();
        user.services = self.services_of(user.id);
        user
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert(&self, user: NewUser) -> Result<User> {
        if self.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::with_internal(
                ErrorCode::DatabaseError,
                "A storage error occurred",
                format!("duplicate email: {}", user.email),
            ));
        }

        let id = self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let user = User {
            id,
            name: user.name,
            email: user.email,
            password: user.password,
            role: user.role,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            services: Vec::new(),
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.deleted_at.is_none())
            .map(|u| self.with_services(&u))
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self
            .users
            .get(&id)
            .filter(|u| u.deleted_at.is_none())
            .map(|u| self.with_services(&u)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .map(|u| u.value().clone()))
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<u64> {
        // Email uniqueness spans soft-deleted rows, like the UNIQUE
        // constraint in the Postgres schema. Checked before taking the
        // write guard.
        if let Some(ref email) = changes.email {
            if self.users.iter().any(|u| u.email == *email && u.id != id) {
                return Err(AppError::with_internal(
                    ErrorCode::DatabaseError,
                    "A storage error occurred",
                    format!("duplicate email: {email}"),
                ));
            }
        }

        match self.users.get_mut(&id) {
            Some(mut user) if user.deleted_at.is_none() => {
                if let Some(name) = changes.name {
                    user.name = name;
                }
                if let Some(email) = changes.email {
                    user.email = email;
                }
                if let Some(role) = changes.role {
                    user.role = role;
                }
                user.updated_at = Utc::now();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn soft_delete(&self, id: i64) -> Result<u64> {
        match self.users.get_mut(&id) {
            Some(mut user) if user.deleted_at.is_none() => {
                user.deleted_at = Some(Utc::now());
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn restore(&self, id: i64) -> Result<u64> {
        match self.users.get_mut(&id) {
            Some(mut user) if user.deleted_at.is_some() => {
                user.deleted_at = None;
                user.updated_at = Utc::now();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn add_assignment(&self, user_id: i64, service_id: i64) -> Result<()> {
        if !self.assignments.insert((user_id, service_id)) {
            return Err(AppError::with_internal(
                ErrorCode::DatabaseError,
                "A storage error occurred",
                format!("assignment ({user_id}, {service_id}) already exists"),
            ));
        }
        Ok(())
    }

    async fn remove_assignment(&self, user_id: i64, service_id: i64) -> Result<()> {
        self.assignments.remove(&(user_id, service_id));
        Ok(())
    }
}

#[async_trait]
impl ServiceStore for InMemoryStore {
    async fn insert(&self, service: NewService) -> Result<Service> {
        let id = self.next_service_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let service = Service {
            id,
            name: service.name,
            description: service.description,
            cost: service.cost,
            category: service.category,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.services.insert(id, service.clone());
        Ok(service)
    }

    async fn find_all(&self) -> Result<Vec<Service>> {
        let mut services: Vec<Service> = self
            .services
            .iter()
            .filter(|s| s.deleted_at.is_none())
            .map(|s| s.value().clone())
            .collect();
        services.sort_by_key(|s| s.id);
        Ok(services)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Service>> {
        Ok(self
            .services
            .get(&id)
            .filter(|s| s.deleted_at.is_none())
            .map(|s| s.clone()))
    }

    async fn update(&self, id: i64, changes: ServiceChanges) -> Result<u64> {
        match self.services.get_mut(&id) {
            Some(mut service) if service.deleted_at.is_none() => {
                if let Some(name) = changes.name {
                    service.name = name;
                }
                if let Some(description) = changes.description {
                    service.description = description;
                }
                if let Some(cost) = changes.cost {
                    service.cost = cost;
                }
                if let Some(category) = changes.category {
                    service.category = category;
                }
                service.updated_at = Utc::now();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn soft_delete(&self, id: i64) -> Result<u64> {
        match self.services.get_mut(&id) {
            Some(mut service) if service.deleted_at.is_none() => {
                service.deleted_at = Some(Utc::now());
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn restore(&self, id: i64) -> Result<u64> {
        match self.services.get_mut(&id) {
            Some(mut service) if service.deleted_at.is_some() => {
                service.deleted_at = None;
                service.updated_at = Utc::now();
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::Role;
    use crate::services::ServiceCategory;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            email: email.to_string(),
            password: "digest".to_string(),
            role: Role::User,
        }
    }

    fn new_service(name: &str) -> NewService {
        NewService {
            name: name.to_string(),
            description: "A service".to_string(),
            cost: 150.0,
            category: ServiceCategory::Home,
        }
    }

    #[tokio::test]
    async fn soft_deleted_users_are_hidden_but_restorable() {
        let store = InMemoryStore::new();
        let user = UserStore::insert(&store, new_user("a@test.com")).await.unwrap();

        assert_eq!(UserStore::soft_delete(&store, user.id).await.unwrap(), 1);
        assert!(UserStore::find_by_id(&store, user.id).await.unwrap().is_none());
        assert!(store.find_by_email("a@test.com").await.unwrap().is_none());

        // Deleting again affects nothing.
        assert_eq!(UserStore::soft_delete(&store, user.id).await.unwrap(), 0);

        assert_eq!(UserStore::restore(&store, user.id).await.unwrap(), 1);
        assert!(UserStore::find_by_id(&store, user.id).await.unwrap().is_some());
        assert_eq!(UserStore::restore(&store, user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_storage_error() {
        let store = InMemoryStore::new();
        UserStore::insert(&store, new_user("a@test.com")).await.unwrap();
        let err = UserStore::insert(&store, new_user("a@test.com"))
            .await
            .unwrap_err();
        assert!(!err.is_expected());
    }

    #[tokio::test]
    async fn update_rejects_duplicate_email() {
        let store = InMemoryStore::new();
        UserStore::insert(&store, new_user("a@test.com")).await.unwrap();
        let second = UserStore::insert(&store, new_user("b@test.com")).await.unwrap();

        let err = UserStore::update(
            &store,
            second.id,
            UserChanges {
                email: Some("a@test.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(!err.is_expected());

        // Writing a user's own email back is not a collision.
        let affected = UserStore::update(
            &store,
            second.id,
            UserChanges {
                email: Some("b@test.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn assignments_load_with_the_user() {
        let store = InMemoryStore::new();
        let user = UserStore::insert(&store, new_user("a@test.com")).await.unwrap();
        let gardening = ServiceStore::insert(&store, new_service("Gardening"))
            .await
            .unwrap();

        store.add_assignment(user.id, gardening.id).await.unwrap();
        let loaded = UserStore::find_by_id(&store, user.id).await.unwrap().unwrap();
        assert_eq!(loaded.services.len(), 1);
        assert_eq!(loaded.services[0].name, "Gardening");

        store.remove_assignment(user.id, gardening.id).await.unwrap();
        let loaded = UserStore::find_by_id(&store, user.id).await.unwrap().unwrap();
        assert!(loaded.services.is_empty());
    }
}
