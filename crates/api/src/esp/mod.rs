//! ESP delivery adapter.
//!
//! One normalized verb set (create, dispatch, cancel, delete) over two
//! structurally different upstream APIs. The variant is selected once, at
//! startup, by inspecting the shape of the configured credential; call sites
//! never branch on it.

mod classic;
mod modern;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::config::EspConfig;
pub use classic::ClassicEsp;
pub use modern::ModernEsp;

/// Which upstream API a credential maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EspVariant {
    /// Legacy key-based API.
    Classic,
    /// Modern token-based API.
    Modern,
}

impl EspVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Modern => "modern",
        }
    }
}

/// Requested (and honored) delivery behavior for `dispatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Leave the campaign as a draft in the ESP.
    Draft,
    /// Defer delivery to the given timestamp.
    Schedule,
    /// Deliver immediately.
    Send,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Schedule => "schedule",
            Self::Send => "send",
        }
    }
}

/// Errors surfaced by the delivery adapter.
#[derive(Debug, Error)]
pub enum EspError {
    /// Credential or sender identity absent.
    #[error("ESP not configured: {0}")]
    NotConfigured(String),

    /// The ESP rejected a call. The message is kept verbatim for the
    /// campaign's error field.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("ESP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Capability-based abstraction over the two ESP API variants.
#[async_trait]
pub trait DeliveryAdapter: Send + Sync {
    fn variant(&self) -> EspVariant;

    /// Whether this variant supports true deferred delivery. When false,
    /// `dispatch` degrades `Schedule` to `Draft` and says so in its return.
    fn supports_scheduling(&self) -> bool;

    /// Submit subject + rendered HTML as a new draft campaign; returns the
    /// upstream campaign identifier.
    async fn create(&self, subject: &str, html: &str) -> Result<String, EspError>;

    /// Trigger delivery of an existing draft. Returns the mode actually
    /// honored, which may differ from the requested one when the variant
    /// cannot schedule.
    async fn dispatch(
        &self,
        campaign_id: &str,
        mode: DispatchMode,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<DispatchMode, EspError>;

    /// Best-effort cancellation of a scheduled campaign.
    async fn cancel(&self, campaign_id: &str) -> Result<(), EspError>;

    /// Best-effort deletion. Upstream "already gone" counts as success,
    /// since this may race with manual cleanup in the ESP's own UI.
    async fn delete(&self, campaign_id: &str) -> Result<(), EspError>;
}

/// Selects the API variant from the credential's shape.
///
/// Modern tokens are JWT-shaped (three dot-separated segments); legacy keys
/// are flat hex strings.
pub fn select_variant(credential: &str) -> EspVariant {
    if credential.split('.').count() == 3 {
        EspVariant::Modern
    } else {
        EspVariant::Classic
    }
}

/// Builds the delivery adapter for the configured credential.
pub fn build_adapter(config: &EspConfig) -> Result<Arc<dyn DeliveryAdapter>, EspError> {
    let adapter: Arc<dyn DeliveryAdapter> = match select_variant(&config.credential) {
        EspVariant::Classic => Arc::new(ClassicEsp::new(config.clone())?),
        EspVariant::Modern => Arc::new(ModernEsp::new(config.clone())?),
    };

    tracing::info!(
        variant = adapter.variant().as_str(),
        supports_scheduling = adapter.supports_scheduling(),
        "ESP delivery adapter selected"
    );

    Ok(adapter)
}

/// Encodes a timestamp into the upstream's date plus time-of-day form.
pub(crate) fn encode_schedule(at: DateTime<Utc>) -> (String, String, String) {
    (
        format!("{:04}-{:02}-{:02}", at.year(), at.month(), at.day()),
        format!("{:02}", at.hour()),
        format!("{:02}", at.minute()),
    )
}

/// Pulls a human-readable message out of an upstream error body.
///
/// Both API generations wrap errors differently; fall back to the raw body.
pub(crate) fn upstream_message(status: u16, body: &str) -> EspError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.pointer("/message"))
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("ESP returned status {}", status)
            } else {
                trimmed.chars().take(500).collect()
            }
        });

    EspError::Upstream { status, message }
}

/// Guard shared by both implementations: calls fail fast when the
/// credential or sender identity is missing.
pub(crate) fn require_configured(config: &EspConfig) -> Result<(), EspError> {
    if config.credential.is_empty() {
        return Err(EspError::NotConfigured(
            "No ESP credential configured".to_string(),
        ));
    }
    if config.from_email.is_empty() {
        return Err(EspError::NotConfigured(
            "No sender identity configured".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_variant_selection_by_credential_shape() {
        // Legacy 32-char hex key.
        assert_eq!(
            select_variant("0123456789abcdef0123456789abcdef"),
            EspVariant::Classic
        );
        // JWT-shaped bearer token.
        assert_eq!(
            select_variant("eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxIn0.c2ln"),
            EspVariant::Modern
        );
        assert_eq!(select_variant(""), EspVariant::Classic);
    }

    #[test]
    fn test_encode_schedule() {
        let at = Utc.with_ymd_and_hms(2030, 6, 1, 18, 5, 0).unwrap();
        let (date, hours, minutes) = encode_schedule(at);
        assert_eq!(date, "2030-06-01");
        assert_eq!(hours, "18");
        assert_eq!(minutes, "05");
    }

    #[test]
    fn test_upstream_message_extraction() {
        let err = upstream_message(422, r#"{"error":{"message":"Subject is required"}}"#);
        match err {
            EspError::Upstream { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Subject is required");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = upstream_message(422, r#"{"message":"Invalid from address"}"#);
        assert_eq!(err.to_string(), "Invalid from address");

        let err = upstream_message(500, "");
        assert_eq!(err.to_string(), "ESP returned status 500");
    }

    #[test]
    fn test_require_configured() {
        let mut config = crate::config::EspConfig::default();
        assert!(require_configured(&config).is_err());

        config.credential = "key".to_string();
        assert!(require_configured(&config).is_err());

        config.from_email = "news@music.example.com".to_string();
        assert!(require_configured(&config).is_ok());
    }

    #[test]
    fn test_dispatch_mode_labels() {
        assert_eq!(DispatchMode::Draft.as_str(), "draft");
        assert_eq!(DispatchMode::Schedule.as_str(), "schedule");
        assert_eq!(DispatchMode::Send.as_str(), "send");
    }
}
