//! Role-based access control and ownership enforcement.
//!
//! This module provides:
//! - **Roles**: the closed `Role` enumeration (`admin`, `user`)
//! - **Role policy**: an operation declares zero or more required roles;
//!   an empty requirement is open to any authenticated principal
//! - **Ownership policy**: identity-sensitive operations on the users
//!   surface are restricted to the account owner, with `admin` granted a
//!   universal override
//!
//! Both policies are pure functions over an explicit [`Principal`]
//! parameter; there is no ambient request state to read from.
//!
//! [`Principal`]: crate::auth::Principal

pub mod policy;
pub mod roles;

pub use policy::{check_ownership, require_role, OwnedAction};
pub use roles::Role;
