//! Persistence layer.
//!
//! Storage is behind pluggable backends:
//! - **PostgresStore**: persistent storage via sqlx
//! - **InMemoryStore**: process-local storage for tests and development
//!
//! The traits model exactly what the operations consume: lookups that
//! exclude soft-deleted rows, partial updates, soft-delete/restore
//! returning affected counts, and assignment add/remove. Any backend
//! failure surfaces as an infrastructure error for the boundary
//! translation to swallow.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::services::{NewService, Service, ServiceChanges};
use crate::users::{NewUser, User, UserChanges};

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// User persistence operations.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user, returning the stored record.
    async fn insert(&self, user: NewUser) -> Result<User>;

    /// All non-deleted users, with their assigned services loaded.
    async fn find_all(&self) -> Result<Vec<User>>;

    /// One non-deleted user by id, with assigned services loaded.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// One non-deleted user by email (digest included, for login).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Apply a partial update; returns the affected row count.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<u64>;

    /// Mark deleted; returns the affected row count (0 if absent or
    /// already deleted).
    async fn soft_delete(&self, id: i64) -> Result<u64>;

    /// Clear the deletion mark; returns the affected row count (0 if
    /// absent or not deleted).
    async fn restore(&self, id: i64) -> Result<u64>;

    /// Record a (user, service) assignment.
    async fn add_assignment(&self, user_id: i64, service_id: i64) -> Result<()>;

    /// Remove a (user, service) assignment.
    async fn remove_assignment(&self, user_id: i64, service_id: i64) -> Result<()>;
}

/// Service catalog persistence operations.
#[async_trait]
pub trait ServiceStore: Send + Sync {
    async fn insert(&self, service: NewService) -> Result<Service>;

    async fn find_all(&self) -> Result<Vec<Service>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Service>>;

    async fn update(&self, id: i64, changes: ServiceChanges) -> Result<u64>;

    async fn soft_delete(&self, id: i64) -> Result<u64>;

    async fn restore(&self, id: i64) -> Result<u64>;
}
