//! HTTP API surface.
//!
//! One router carrying every route. The auth layer runs globally: it
//! verifies bearer tokens when present and injects the principal, while
//! public routes (login, registration, health, metrics) simply never
//! extract one. Protected handlers extract [`Principal`]
//! and fail with `Unauthorized` when the request carried no valid token.

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthLayer, AuthService, TokenManager};
use crate::services::ServiceManager;
use crate::users::UserService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub catalog: Arc<ServiceManager>,
}

/// Uniform success envelope; errors are serialized by `AppError`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState, tokens: Arc<TokenManager>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/auth/login", post(handlers::login))
        .route(
            "/users",
            post(handlers::create_user).get(handlers::list_users),
        )
        .route(
            "/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/users/:id/restore", patch(handlers::restore_user))
        .route(
            "/users/:user_id/services/:service_id",
            post(handlers::assign_service).delete(handlers::remove_service),
        )
        .route(
            "/services",
            get(handlers::list_services).post(handlers::create_service),
        )
        .route(
            "/services/:id",
            get(handlers::get_service)
                .put(handlers::update_service)
                .delete(handlers::delete_service),
        )
        .route("/services/:id/restore", patch(handlers::restore_service))
        .layer(AuthLayer::new(tokens))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
