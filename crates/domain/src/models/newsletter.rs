//! Newsletter campaign domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::validation::{is_absolute_http_url, validate_subject};

/// Which email template a campaign uses. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendKind {
    /// Poster image with optional caption, poster layout.
    Poster,
    /// Free-form HTML body, article layout.
    Text,
}

impl SendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poster => "poster",
            Self::Text => "text",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "poster" => Some(Self::Poster),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Campaign lifecycle status.
///
/// Legal transitions: `scheduled -> sending -> {sent | error}` and
/// `scheduled -> cancelled`. `error` is terminal from the processor's
/// perspective; a failed campaign is resubmitted by a human, never retried
/// automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Scheduled,
    Sending,
    Sent,
    Error,
    Cancelled,
}

impl SendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "sending" => Some(Self::Sending),
            "sent" => Some(Self::Sent),
            "error" => Some(Self::Error),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Only campaigns still waiting for their slot can be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Scheduled)
    }
}

/// How the author wants the campaign delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    /// Dispatch synchronously as part of the authoring request.
    Now,
    /// Persist as `scheduled` and let a processor pass claim it when due.
    Schedule,
}

/// Represents one outbound email campaign.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSend {
    pub id: i64,
    pub subject: String,
    pub kind: SendKind,
    pub body_html: Option<String>,
    pub poster_url: Option<String>,
    pub poster_text: Option<String>,
    pub button_text: Option<String>,
    pub button_link: Option<String>,
    pub status: SendStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Set exactly once, when the campaign transitions to `sent`.
    pub sent_at: Option<DateTime<Utc>>,
    /// Last failure message; cleared on a successful transition.
    pub error: Option<String>,
    /// The ESP's identifier for this campaign, set after a successful
    /// upstream create call.
    pub campaign_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request payload for authoring a campaign.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSendRequest {
    #[validate(custom(function = "validate_subject"))]
    pub subject: String,

    pub kind: SendKind,

    pub body_html: Option<String>,
    pub poster_url: Option<String>,
    pub poster_text: Option<String>,
    pub button_text: Option<String>,
    pub button_link: Option<String>,

    pub send_mode: SendMode,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl CreateSendRequest {
    /// Cross-field validation the derive cannot express.
    ///
    /// Rejected drafts never reach the store.
    pub fn validate_content(&self) -> Result<(), String> {
        match self.kind {
            SendKind::Text => {
                let has_body = self
                    .body_html
                    .as_deref()
                    .map(|b| !b.trim().is_empty())
                    .unwrap_or(false);
                if !has_body {
                    return Err("A text campaign requires a non-empty bodyHtml".to_string());
                }
            }
            SendKind::Poster => {
                match self.poster_url.as_deref() {
                    Some(url) if is_absolute_http_url(url) => {}
                    Some(_) => {
                        return Err("posterUrl must be an absolute http(s) URL".to_string())
                    }
                    None => return Err("A poster campaign requires a posterUrl".to_string()),
                }
            }
        }

        if let Some(link) = self.button_link.as_deref() {
            if !link.trim().is_empty() && !is_absolute_http_url(link) {
                return Err("buttonLink must be an absolute http(s) URL".to_string());
            }
        }

        if self.send_mode == SendMode::Schedule && self.scheduled_at.is_none() {
            return Err("sendMode=schedule requires scheduledAt".to_string());
        }

        Ok(())
    }
}

/// Response payload for the authoring endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub send_id: i64,
    pub status: SendStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Outcome of one processor pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    /// Rows claimed by this pass.
    pub processed: u32,
    /// Rows that reached `sent`.
    pub sent: u32,
    /// Rows that reached `error`.
    pub failed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn text_request() -> CreateSendRequest {
        CreateSendRequest {
            subject: "New single out now".to_string(),
            kind: SendKind::Text,
            body_html: Some("<p>Hello</p>".to_string()),
            poster_url: None,
            poster_text: None,
            button_text: None,
            button_link: None,
            send_mode: SendMode::Now,
            scheduled_at: None,
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            SendStatus::Scheduled,
            SendStatus::Sending,
            SendStatus::Sent,
            SendStatus::Error,
            SendStatus::Cancelled,
        ] {
            assert_eq!(SendStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SendStatus::parse("draft"), None);
    }

    #[test]
    fn test_only_scheduled_can_cancel() {
        assert!(SendStatus::Scheduled.can_cancel());
        assert!(!SendStatus::Sending.can_cancel());
        assert!(!SendStatus::Sent.can_cancel());
        assert!(!SendStatus::Error.can_cancel());
        assert!(!SendStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(SendKind::parse("POSTER"), Some(SendKind::Poster));
        assert_eq!(SendKind::parse("text"), Some(SendKind::Text));
        assert_eq!(SendKind::parse("video"), None);
    }

    #[test]
    fn test_request_deserialization_camel_case() {
        let json = r#"{
            "subject": "Tour dates",
            "kind": "poster",
            "posterUrl": "https://cdn.example.com/tour.jpg",
            "posterText": "See you there",
            "sendMode": "schedule",
            "scheduledAt": "2030-06-01T18:00:00Z"
        }"#;

        let request: CreateSendRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.kind, SendKind::Poster);
        assert_eq!(request.send_mode, SendMode::Schedule);
        assert!(request.scheduled_at.is_some());
        assert!(request.validate_content().is_ok());
    }

    #[test]
    fn test_text_campaign_requires_body() {
        let mut request = text_request();
        request.body_html = Some("   ".to_string());
        assert!(request.validate_content().is_err());

        request.body_html = None;
        assert!(request.validate_content().is_err());
    }

    #[test]
    fn test_poster_campaign_requires_absolute_url() {
        let mut request = text_request();
        request.kind = SendKind::Poster;
        request.poster_url = Some("/uploads/poster.jpg".to_string());
        assert!(request.validate_content().is_err());

        request.poster_url = Some("https://cdn.example.com/poster.jpg".to_string());
        assert!(request.validate_content().is_ok());
    }

    #[test]
    fn test_schedule_mode_requires_timestamp() {
        let mut request = text_request();
        request.send_mode = SendMode::Schedule;
        assert!(request.validate_content().is_err());

        request.scheduled_at = Some(Utc::now() + Duration::hours(2));
        assert!(request.validate_content().is_ok());
    }

    #[test]
    fn test_button_link_must_be_absolute() {
        let mut request = text_request();
        request.button_link = Some("shop/merch".to_string());
        assert!(request.validate_content().is_err());

        request.button_link = Some("https://shop.example.com/merch".to_string());
        assert!(request.validate_content().is_ok());
    }

    #[test]
    fn test_process_summary_serialization() {
        let summary = ProcessSummary {
            processed: 3,
            sent: 2,
            failed: 1,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(json, r#"{"processed":3,"sent":2,"failed":1}"#);
    }
}
