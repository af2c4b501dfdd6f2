//! # Servio
//!
//! A role-aware access-control layer over a users and services API.
//!
//! ## Architecture
//!
//! - **auth**: credential verification (Argon2), token issuance and
//!   verification (HS256 JWT), and the per-request [`auth::Principal`]
//! - **rbac**: pure role and ownership policy checks, evaluated with an
//!   explicit principal before any storage access
//! - **users** / **services**: the domain operations, each applying
//!   policy then the uniform error boundary translation
//! - **store**: pluggable persistence (`PostgresStore`, `InMemoryStore`)
//!   behind async traits
//! - **api**: axum router, handlers, and request validation
//! - **error**: closed error taxonomy with user/internal message split
//! - **telemetry**: tracing subscriber and Prometheus metrics exporter
//!
//! Authorization decisions live in the operations themselves: handlers
//! extract a verified principal and pass it down, so every access rule is
//! visible at the call site that enforces it.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod rbac;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod users;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::api::{build_router, ApiResponse, AppState};
    pub use crate::auth::{AuthService, Principal, TokenManager};
    pub use crate::config::Config;
    pub use crate::error::{AppError, ErrorBoundary, ErrorCode, Result};
    pub use crate::rbac::Role;
    pub use crate::services::{Service, ServiceCategory, ServiceManager};
    pub use crate::store::{InMemoryStore, PostgresStore, ServiceStore, UserStore};
    pub use crate::users::{User, UserService};
}
