//! User account data model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::rbac::Role;
use crate::services::Service;

/// A user account with its assigned services.
///
/// The password digest never serializes; responses built from this type
/// cannot leak it.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub services: Vec<Service>,
}

/// Fields for creating a user. `password` is the already-hashed digest.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}
