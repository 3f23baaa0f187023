//! Tracking collector routes.
//!
//! Two public, unauthenticated, side-effect endpoints hit by recipients'
//! mail clients and browsers. Recording failures are logged and swallowed;
//! tracking must never break the recipient's browsing experience.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::TrackingEventType;
use persistence::repositories::NewsletterEventRepository;
use shared::validation::is_absolute_http_url;

/// 1x1 transparent GIF served by the open pixel.
const TRANSPARENT_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, // GIF89a
    0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, // 1x1, global colour table
    0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, // palette
    0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, // transparency extension
    0x2C, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, // image descriptor
    0x02, 0x02, 0x44, 0x01, 0x00, // pixel data
    0x3B, // trailer
];

/// Query parameters for both tracking endpoints.
///
/// `id` is a string so a malformed value degrades to "no event recorded"
/// instead of a client error; the pixel and redirect still work.
#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub id: Option<String>,
    pub url: Option<String>,
}

fn client_user_agent(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok())
}

/// Best-effort event insert. Failure to write must not affect the response.
async fn record_event(
    state: &AppState,
    id: Option<&str>,
    event_type: TrackingEventType,
    link_url: Option<&str>,
    user_agent: Option<&str>,
) {
    let send_id = match id.and_then(|raw| raw.parse::<i64>().ok()) {
        Some(id) => id,
        None => {
            debug!(event_type = event_type.as_str(), "Tracking ping without a usable id");
            return;
        }
    };

    let repo = NewsletterEventRepository::new(state.pool.clone());
    if let Err(e) = repo
        .record(send_id, event_type, link_url, user_agent)
        .await
    {
        warn!(
            send_id,
            event_type = event_type.as_str(),
            error = %e,
            "Failed to record tracking event"
        );
    }
}

/// GET /track/open?id=<sendId>
///
/// Records an open event and always returns the pixel, regardless of
/// whether the id is valid.
pub async fn track_open(
    State(state): State<AppState>,
    Query(query): Query<TrackQuery>,
    headers: HeaderMap,
) -> Response {
    record_event(
        &state,
        query.id.as_deref(),
        TrackingEventType::Open,
        None,
        client_user_agent(&headers),
    )
    .await;

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/gif"),
            (
                header::CACHE_CONTROL,
                "no-store, no-cache, must-revalidate, max-age=0",
            ),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        TRANSPARENT_GIF.to_vec(),
    )
        .into_response()
}

/// GET /track/click?id=<sendId>&url=<encoded>
///
/// Records a click event and redirects to the decoded destination. The
/// query layer decodes the URL exactly once; a malformed escape sequence
/// falls through as the raw string. Only absolute http(s) destinations are
/// accepted as redirect targets.
pub async fn track_click(
    State(state): State<AppState>,
    Query(query): Query<TrackQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let url = match query.url.as_deref() {
        Some(url) if is_absolute_http_url(url) => url.to_string(),
        Some(_) => {
            return Err(ApiError::Validation(
                "url must be an absolute http(s) URL".to_string(),
            ))
        }
        None => {
            return Err(ApiError::Validation(
                "Missing url parameter".to_string(),
            ))
        }
    };

    record_event(
        &state,
        query.id.as_deref(),
        TrackingEventType::Click,
        Some(&url),
        client_user_agent(&headers),
    )
    .await;

    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gif_is_valid_1x1() {
        assert_eq!(&TRANSPARENT_GIF[..6], b"GIF89a");
        // Logical screen is 1x1, little-endian u16 pairs.
        assert_eq!(&TRANSPARENT_GIF[6..10], &[0x01, 0x00, 0x01, 0x00]);
        assert_eq!(TRANSPARENT_GIF[42], 0x3B);
    }

    #[test]
    fn test_track_query_tolerates_missing_fields() {
        let query: TrackQuery = serde_urlencoded::from_str("").unwrap();
        assert!(query.id.is_none());
        assert!(query.url.is_none());

        let query: TrackQuery =
            serde_urlencoded::from_str("id=7&url=https%3A%2F%2Fexample.com").unwrap();
        assert_eq!(query.id.as_deref(), Some("7"));
        // Decoded exactly once by the query layer.
        assert_eq!(query.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_non_numeric_id_is_not_an_error() {
        // The handler degrades to "no event" rather than rejecting the
        // request; the parse mirrors record_event's id handling.
        assert!("abc".parse::<i64>().is_err());
        assert!("7".parse::<i64>().is_ok());
    }
}
