//! Authentication: credential verification, token issuance, and the
//! per-request principal.
//!
//! - **password**: salted one-way hashing and verification (Argon2)
//! - **token**: signed, time-limited identity assertions (HS256 JWT);
//!   the token is the entire session mechanism — stateless, never stored,
//!   never refreshed
//! - **principal**: the resolved identity (id + role) reconstructed from a
//!   verified token on every request and passed explicitly to operations
//! - **middleware**: tower layer that verifies bearer tokens and injects
//!   the principal into request extensions
//! - **service**: the login flow (credential check, token minting)

pub mod middleware;
pub mod password;
pub mod principal;
pub mod service;
pub mod token;

pub use middleware::{AuthLayer, AuthMiddleware};
pub use principal::Principal;
pub use service::{AuthService, LoginResponse};
pub use token::{Claims, TokenManager};
