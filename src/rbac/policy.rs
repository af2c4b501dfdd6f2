//! Role and ownership policy checks.
//!
//! Pure decision functions: no IO, no panics, no business logic. Operations
//! call these with an explicit principal before touching storage, so an
//! ownership denial is reported even when the target id does not exist —
//! a non-owning, non-admin principal never learns whether a target exists.

use crate::auth::Principal;
use crate::error::{AppError, Result};

use super::Role;

/// Allow iff the required set is empty or the principal's role is a member.
///
/// An empty requirement means "open to any authenticated principal"; the
/// caller has already established authentication by constructing a
/// [`Principal`] from a verified token.
pub fn require_role(principal: &Principal, required: &[Role]) -> Result<()> {
    if required.is_empty() || required.contains(&principal.role) {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "Access denied, insufficient permissions",
        ))
    }
}

/// Ownership-gated operations on the users surface, each bound to the verb
/// used in its denial message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnedAction {
    Search,
    Update,
    Delete,
    Restore,
    AssignServices,
    RemoveServices,
}

impl OwnedAction {
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Restore => "restore",
            Self::AssignServices => "assign services to",
            Self::RemoveServices => "remove services from",
        }
    }
}

/// Allow iff the target account is the principal's own or the principal is
/// an admin.
///
/// Must be evaluated before the target record is fetched; the denial takes
/// precedence over any not-found outcome.
pub fn check_ownership(principal: &Principal, target_id: i64, action: OwnedAction) -> Result<()> {
    if principal.id == target_id || principal.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "You can only {} your own account",
            action.verb()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn user(id: i64) -> Principal {
        Principal { id, role: Role::User }
    }

    fn admin(id: i64) -> Principal {
        Principal { id, role: Role::Admin }
    }

    #[test]
    fn empty_requirement_is_open_to_any_principal() {
        assert!(require_role(&user(1), &[]).is_ok());
        assert!(require_role(&admin(1), &[]).is_ok());
    }

    #[test]
    fn role_must_be_member_of_required_set() {
        assert!(require_role(&admin(1), &[Role::Admin]).is_ok());
        let err = require_role(&user(1), &[Role::Admin]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert_eq!(err.user_message(), "Access denied, insufficient permissions");
    }

    #[test]
    fn owner_passes_ownership_check() {
        assert!(check_ownership(&user(5), 5, OwnedAction::Update).is_ok());
    }

    #[test]
    fn admin_bypasses_ownership_everywhere() {
        for action in [
            OwnedAction::Search,
            OwnedAction::Update,
            OwnedAction::Delete,
            OwnedAction::Restore,
            OwnedAction::AssignServices,
            OwnedAction::RemoveServices,
        ] {
            assert!(check_ownership(&admin(9), 1, action).is_ok());
        }
    }

    #[test]
    fn non_owner_is_denied_with_action_specific_verb() {
        let cases = [
            (OwnedAction::Search, "You can only search your own account"),
            (OwnedAction::Update, "You can only update your own account"),
            (OwnedAction::Delete, "You can only delete your own account"),
            (OwnedAction::Restore, "You can only restore your own account"),
            (
                OwnedAction::AssignServices,
                "You can only assign services to your own account",
            ),
            (
                OwnedAction::RemoveServices,
                "You can only remove services from your own account",
            ),
        ];

        for (action, message) in cases {
            let err = check_ownership(&user(1), 2, action).unwrap_err();
            assert_eq!(err.code(), ErrorCode::Forbidden);
            assert_eq!(err.user_message(), message);
        }
    }
}
