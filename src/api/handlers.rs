//! Request handlers and DTO validation.
//!
//! Handlers stay thin: deserialize, validate shape, hand off to the
//! operation with the extracted principal, wrap the outcome. Validation
//! failures are rejected here, before any operation runs, and are never
//! converted into internal errors.

use std::sync::OnceLock;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use regex::Regex;
use serde::Deserialize;

use crate::auth::Principal;
use crate::error::{AppError, Result};
use crate::rbac::Role;
use crate::services::{NewService, ServiceCategory, ServiceChanges};
use crate::telemetry;
use crate::users::UserChanges;

use super::{ApiResponse, AppState};

// ═══════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: String,
    pub cost: f64,
    pub category: ServiceCategory,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cost: Option<f64>,
    pub category: Option<ServiceCategory>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════════════════════

const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\w+([\.-]?\w+)*@\w+([\.-]?\w+)*(\.\w{2,3})+$").unwrap()
    })
}

fn validate_non_empty(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    if !email_pattern().is_match(email) {
        return Err(AppError::validation("Email must be a valid email address"));
    }
    Ok(())
}

/// At least 8 characters with upper and lower case letters, a digit and a
/// special character, drawn only from the allowed set.
fn validate_password(password: &str) -> Result<()> {
    let long_enough = password.chars().count() >= 8;
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    let only_allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));

    if long_enough && has_lower && has_upper && has_digit && has_special && only_allowed {
        Ok(())
    } else {
        Err(AppError::validation(
            "Password must be at least 8 characters and contain upper and lower \
             case letters, a number and a special character",
        ))
    }
}

fn validate_cost(cost: f64) -> Result<()> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(AppError::validation("Cost must be a non-negative number"));
    }
    // At most two decimal places.
    if ((cost * 100.0).round() - cost * 100.0).abs() > 1e-9 {
        return Err(AppError::validation(
            "Cost must have at most 2 decimal places",
        ));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Infrastructure endpoints
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn prometheus_metrics() -> impl IntoResponse {
    match telemetry::metrics_handle() {
        Some(handle) => handle.render().into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed",
        )
            .into_response(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Auth
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    validate_non_empty(&body.email, "Email")?;
    validate_non_empty(&body.password, "Password")?;

    let response = state.auth.login(&body.email, &body.password).await?;
    Ok(Json(ApiResponse::success(response)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Users
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    validate_non_empty(&body.name, "Name")?;
    validate_email(&body.email)?;
    validate_password(&body.password)?;

    let user = state
        .users
        .create(
            body.name,
            body.email,
            &body.password,
            body.role.unwrap_or_default(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn list_users(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse> {
    let users = state.users.find_all(&principal).await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let user = state.users.find_one(&principal, id).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse> {
    if let Some(ref name) = body.name {
        validate_non_empty(name, "Name")?;
    }
    if let Some(ref email) = body.email {
        validate_email(email)?;
    }

    let changes = UserChanges {
        name: body.name,
        email: body.email,
        role: body.role,
    };
    let message = state.users.update(&principal, id, changes).await?;
    Ok(Json(ApiResponse::success(message)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let message = state.users.soft_delete(&principal, id).await?;
    Ok(Json(ApiResponse::success(message)))
}

pub async fn restore_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let message = state.users.restore(&principal, id).await?;
    Ok(Json(ApiResponse::success(message)))
}

pub async fn assign_service(
    State(state): State<AppState>,
    principal: Principal,
    Path((user_id, service_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse> {
    let message = state
        .users
        .assign_service(&principal, user_id, service_id)
        .await?;
    Ok(Json(ApiResponse::success(message)))
}

pub async fn remove_service(
    State(state): State<AppState>,
    principal: Principal,
    Path((user_id, service_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse> {
    let message = state
        .users
        .remove_service(&principal, user_id, service_id)
        .await?;
    Ok(Json(ApiResponse::success(message)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Services
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn create_service(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<CreateServiceRequest>,
) -> Result<impl IntoResponse> {
    validate_non_empty(&body.name, "Name")?;
    validate_non_empty(&body.description, "Description")?;
    validate_cost(body.cost)?;

    let service = state
        .catalog
        .create(
            &principal,
            NewService {
                name: body.name,
                description: body.description,
                cost: body.cost,
                category: body.category,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(service))))
}

pub async fn list_services(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse> {
    let services = state.catalog.find_all(&principal).await?;
    Ok(Json(ApiResponse::success(services)))
}

pub async fn get_service(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let service = state.catalog.find_one(&principal, id).await?;
    Ok(Json(ApiResponse::success(service)))
}

pub async fn update_service(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(body): Json<UpdateServiceRequest>,
) -> Result<impl IntoResponse> {
    if let Some(ref name) = body.name {
        validate_non_empty(name, "Name")?;
    }
    if let Some(ref description) = body.description {
        validate_non_empty(description, "Description")?;
    }
    if let Some(cost) = body.cost {
        validate_cost(cost)?;
    }

    let changes = ServiceChanges {
        name: body.name,
        description: body.description,
        cost: body.cost,
        category: body.category,
    };
    let message = state.catalog.update(&principal, id, changes).await?;
    Ok(Json(ApiResponse::success(message)))
}

pub async fn delete_service(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let message = state.catalog.soft_delete(&principal, id).await?;
    Ok(Json(ApiResponse::success(message)))
}

pub async fn restore_service(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let message = state.catalog.restore(&principal, id).await?;
    Ok(Json(ApiResponse::success(message)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_emails() {
        for email in [
            "cristian@test.com",
            "first.last@example.org",
            "user-name@mail.co",
        ] {
            assert!(validate_email(email).is_ok(), "rejected {email}");
        }
    }

    #[test]
    fn rejects_malformed_emails() {
        for email in ["", "not-an-email", "a@b", "a@@b.com", "@test.com"] {
            assert!(validate_email(email).is_err(), "accepted {email}");
        }
    }

    #[test]
    fn password_needs_all_character_classes() {
        assert!(validate_password("Password1!").is_ok());
        // Too short.
        assert!(validate_password("Pa1!").is_err());
        // Missing upper case.
        assert!(validate_password("password1!").is_err());
        // Missing digit.
        assert!(validate_password("Password!!").is_err());
        // Missing special.
        assert!(validate_password("Password11").is_err());
        // Disallowed character.
        assert!(validate_password("Password1! ").is_err());
    }

    #[test]
    fn cost_must_be_non_negative_with_two_decimals() {
        assert!(validate_cost(0.0).is_ok());
        assert!(validate_cost(99.99).is_ok());
        assert!(validate_cost(120.5).is_ok());
        assert!(validate_cost(-1.0).is_err());
        assert!(validate_cost(10.999).is_err());
        assert!(validate_cost(f64::NAN).is_err());
    }
}
