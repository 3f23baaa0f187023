//! Common validation utilities.

use chrono::{DateTime, Utc};
use validator::ValidationError;

/// Maximum subject length accepted from the authoring endpoint.
pub const MAX_SUBJECT_LENGTH: usize = 200;

/// Returns true for absolute `http://` or `https://` URLs.
///
/// Anything else (mailto:, tel:, relative paths, anchors) is not a
/// trackable destination and must be left alone by the link rewriter.
pub fn is_absolute_http_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Validates that a value is an absolute http(s) URL.
pub fn validate_absolute_url(url: &str) -> Result<(), ValidationError> {
    if is_absolute_http_url(url) {
        Ok(())
    } else {
        let mut err = ValidationError::new("absolute_url");
        err.message = Some("Must be an absolute http(s) URL".into());
        Err(err)
    }
}

/// Validates that a campaign subject is non-empty after trimming.
pub fn validate_subject(subject: &str) -> Result<(), ValidationError> {
    let trimmed = subject.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("subject_empty");
        err.message = Some("Subject must not be empty".into());
        return Err(err);
    }
    if trimmed.len() > MAX_SUBJECT_LENGTH {
        let mut err = ValidationError::new("subject_length");
        err.message = Some("Subject is too long".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a deferred-delivery timestamp is in the future.
pub fn validate_future_timestamp(ts: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *ts > Utc::now() {
        Ok(())
    } else {
        let mut err = ValidationError::new("timestamp_past");
        err.message = Some("Scheduled time must be in the future".into());
        Err(err)
    }
}
