//! Authentication middleware.
//!
//! Two independent gates: a bearer token for author-facing newsletter
//! routes, and a shared secret header for the external processor trigger.
//! Both compare hashes so a missing or wrong credential costs the same.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;
use shared::secret::secrets_match;

/// Header carrying the processor shared secret.
pub const PROCESSOR_SECRET_HEADER: &str = "X-Processor-Secret";

/// Middleware for author-facing routes.
///
/// Validates `Authorization: Bearer <token>` against the configured admin
/// token. An unconfigured token rejects every request.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if secrets_match(token, &state.config.newsletter.admin_token) => {
            next.run(req).await
        }
        _ => ApiError::Unauthorized("Invalid or missing bearer token".to_string()).into_response(),
    }
}

/// Middleware for the processor trigger route.
///
/// Validates the `X-Processor-Secret` header against the configured
/// processor secret.
pub async fn require_processor_secret(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(PROCESSOR_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(secret) if secrets_match(secret, &state.config.newsletter.processor_secret) => {
            next.run(req).await
        }
        _ => ApiError::Unauthorized("Invalid or missing processor secret".to_string())
            .into_response(),
    }
}
