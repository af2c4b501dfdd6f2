//! The per-request principal.

use crate::rbac::Role;

use super::Claims;

/// The authenticated identity attached to a request.
///
/// Reconstructed from the token's signed payload on every request — never
/// persisted as a session — and passed explicitly to every gated
/// operation. Lifetime: one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

impl From<&Claims> for Principal {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}
