//! Authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use pila_core::{AuthError, AuthRequest, Identity, Step};

use super::ApiError;
use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Authentication middleware that resolves the caller with the configured authenticator.
///
/// The resulting [`Identity`] is stored in request extensions for [`AuthUser`].
/// Failures are answered with 401 before the handler runs.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authenticator = state.authenticator();

    // Header names are already lowercase in the http crate.
    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let source_ip = request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));

    let auth_request = AuthRequest { headers, source_ip };

    match authenticator.authenticate(&auth_request).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(AuthError::NotAuthenticated) => {
            AUTH_FAILURES_TOTAL
                .with_label_values(&["not_authenticated"])
                .inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(AuthError::InvalidCredentials(reason)) => {
            tracing::debug!(%reason, "Rejected credentials");
            AUTH_FAILURES_TOTAL
                .with_label_values(&["invalid_credentials"])
                .inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            tracing::error!("Authenticator failed: {}", e);
            AUTH_FAILURES_TOTAL
                .with_label_values(&["internal_error"])
                .inc();
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Extractor for the authenticated caller.
///
/// Rejects with 401 when no identity was stored, i.e. the route is not behind
/// [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl AuthUser {
    /// Check that the caller's role may act at `step`.
    pub fn require_step(&self, step: Step) -> Result<(), ApiError> {
        if self.0.role.may_serve(step) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "role {} may not act at step {}",
                self.0.role, step
            )))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let identity = parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or(StatusCode::UNAUTHORIZED);
        std::future::ready(identity)
    }
}
