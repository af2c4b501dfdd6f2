//! Login operation: credential verification and token issuance.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::{AppError, ErrorBoundary, Result};
use crate::store::UserStore;

use super::{password, TokenManager};

/// Response body for a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Authentication entry point.
///
/// The only operation that accepts raw credentials; everything else in the
/// system works from a verified token.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenManager>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenManager>) -> Self {
        Self { users, tokens }
    }

    /// Verify credentials and issue a signed token.
    ///
    /// An unknown email reports `NotFound` naming the email; a wrong
    /// password reports `Unauthorized` without revealing which part was
    /// wrong beyond "credentials".
    pub async fn login(&self, email: &str, plaintext: &str) -> Result<LoginResponse> {
        self.login_inner(email, plaintext)
            .await
            .or_internal("Invalid credentials")
    }

    async fn login_inner(&self, email: &str, plaintext: &str) -> Result<LoginResponse> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("User with email {email} not found"))
            })?;

        if !password::verify(plaintext, &user.password)? {
            return Err(AppError::unauthorized("Invalid credentials"));
        }

        let token = self
            .tokens
            .issue(user.id, &user.name, &user.email, user.role)?;

        info!(user_id = user.id, "user logged in");
        Ok(LoginResponse { token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password;
    use crate::error::ErrorCode;
    use crate::rbac::Role;
    use crate::store::InMemoryStore;
    use crate::users::NewUser;

    async fn service_with_user(email: &str, plaintext: &str) -> AuthService {
        let store = Arc::new(InMemoryStore::new());
        UserStore::insert(
            store.as_ref(),
            NewUser {
                name: "Cristian".to_string(),
                email: email.to_string(),
                password: password::hash(plaintext).unwrap(),
                role: Role::User,
            },
        )
        .await
        .unwrap();

        let tokens = Arc::new(TokenManager::new("test-secret", 3600));
        AuthService::new(store, tokens)
    }

    #[tokio::test]
    async fn login_issues_a_verifiable_token() {
        let auth = service_with_user("cristian@test.com", "Password1!").await;
        let response = auth.login("cristian@test.com", "Password1!").await.unwrap();

        let tokens = TokenManager::new("test-secret", 3600);
        let claims = tokens.verify(&response.token).unwrap();
        assert_eq!(claims.email, "cristian@test.com");
        assert_eq!(claims.role, Role::User);
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let auth = service_with_user("cristian@test.com", "Password1!").await;
        let err = auth.login("nobody@test.com", "Password1!").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(
            err.user_message(),
            "User with email nobody@test.com not found"
        );
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let auth = service_with_user("cristian@test.com", "Password1!").await;
        let err = auth.login("cristian@test.com", "WrongPass1!").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.user_message(), "Invalid credentials");
    }
}
