//! Password hashing and verification.
//!
//! Argon2id with a fresh random salt per hash, so two hashes of the same
//! plaintext always differ. A mismatch and an infrastructure failure of the
//! primitive are distinct outcomes: `Ok(false)` vs `Err(_)` — callers must
//! never confuse the two.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::{AppError, ErrorCode, Result};

/// Hash a plaintext password with a fresh random salt.
pub fn hash(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| {
            AppError::with_internal(
                ErrorCode::InternalError,
                "Error hashing password",
                e.to_string(),
            )
        })?;
    Ok(digest.to_string())
}

/// Check a plaintext password against a stored digest.
///
/// Returns `Ok(false)` for a mismatch. A malformed digest or any other
/// failure of the hashing primitive is an infrastructure error.
pub fn verify(plaintext: &str, digest: &str) -> Result<bool> {
    let parsed = PasswordHash::new(digest).map_err(|e| {
        AppError::with_internal(
            ErrorCode::InternalError,
            "Error verifying password",
            format!("stored digest is malformed: {e}"),
        )
    })?;

    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::with_internal(
            ErrorCode::InternalError,
            "Error verifying password",
            e.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_succeeds() {
        let digest = hash("Colombia2024*").unwrap();
        assert!(verify("Colombia2024*", &digest).unwrap());
    }

    #[test]
    fn wrong_password_is_a_mismatch_not_an_error() {
        let digest = hash("Colombia2024*").unwrap();
        assert!(!verify("NotThePassword1!", &digest).unwrap());
    }

    #[test]
    fn same_plaintext_hashes_differently() {
        let a = hash("Colombia2024*").unwrap();
        let b = hash("Colombia2024*").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_digest_is_an_infrastructure_error() {
        let err = verify("whatever", "not-a-phc-string").unwrap_err();
        assert!(!err.is_expected());
    }
}
