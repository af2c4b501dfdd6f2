//! Token issuance and verification.
//!
//! Tokens are compact HS256 JWTs carrying the principal's identity claims.
//! They are minted at login with a fixed lifetime, die at expiry, and are
//! never refreshed or stored server-side. Verification distinguishes
//! expired tokens from malformed/forged ones internally; both collapse to
//! an unauthorized outcome at the HTTP boundary.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, ErrorCode, Result};
use crate::rbac::Role;

/// Identity claims embedded in a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: i64,

    /// User display name
    pub name: String,

    /// User email
    pub email: String,

    /// Role at issuance time
    pub role: Role,

    /// Token id
    #[serde(default = "generate_jti")]
    pub jti: String,

    /// Issued at (unix seconds)
    pub iat: i64,

    /// Expiration (unix seconds)
    pub exp: i64,
}

fn generate_jti() -> String {
    Uuid::new_v4().to_string()
}

/// Issues and verifies signed identity tokens.
///
/// The signing secret is process-wide configuration, loaded once at
/// startup and never rotated at runtime.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenManager {
    /// Create a manager signing with the given secret, issuing tokens with
    /// the given lifetime in seconds.
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Mint a token for the given identity.
    pub fn issue(&self, id: i64, name: &str, email: &str, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: id,
            name: name.to_string(),
            email: email.to_string(),
            role,
            jti: generate_jti(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            AppError::with_internal(
                ErrorCode::InternalError,
                "Error generating token",
                e.to_string(),
            )
        })
    }

    /// Verify signature integrity and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!("token validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::new(
                    ErrorCode::TokenExpired,
                    "The authentication token has expired",
                ),
                _ => AppError::new(ErrorCode::InvalidToken, "The provided token is invalid"),
            }
        })?;

        Ok(data.claims)
    }
}
