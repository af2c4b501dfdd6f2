//! Bearer-token middleware.
//!
//! A tower layer that, when an `Authorization: Bearer` header is present,
//! verifies the token and injects the resolved [`Principal`] into request
//! extensions. Requests without credentials pass through untouched;
//! handlers that require authentication extract [`Principal`] and reject
//! with `Unauthorized` when it is absent. This keeps authorization
//! decisions in the operations themselves (explicit context passing)
//! while failing invalid tokens as early as possible.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use metrics::counter;
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};

use crate::error::AppError;

use super::{Principal, TokenManager};

/// Authentication layer for tower.
#[derive(Clone)]
pub struct AuthLayer {
    tokens: Arc<TokenManager>,
}

impl AuthLayer {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            tokens: self.tokens.clone(),
        }
    }
}

/// Middleware service wrapping the router.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    tokens: Arc<TokenManager>,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let tokens = self.tokens.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if let Some(token) = extract_bearer(request.headers()) {
                match tokens.verify(&token) {
                    Ok(claims) => {
                        request.extensions_mut().insert(Principal::from(&claims));
                    }
                    Err(err) => {
                        counter!(
                            "servio_auth_failures_total",
                            "code" => err.code().to_string()
                        )
                        .increment(1);
                        return Ok(err.into_response());
                    }
                }
            }

            inner.call(request).await
        })
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| {
            s.strip_prefix("Bearer ")
                .or_else(|| s.strip_prefix("bearer "))
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
}

/// Extractor for the authenticated principal in handlers.
///
/// Rejects with `Unauthorized` when the request carried no valid token.
#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .ok_or_else(|| AppError::unauthorized("Authentication credentials are required"))
    }
}
