//! Engagement tracking domain model.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a recipient did with a campaign email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingEventType {
    Open,
    Click,
}

impl TrackingEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Click => "click",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "click" => Some(Self::Click),
            _ => None,
        }
    }
}

/// One engagement ping from a recipient's mail client or browser.
///
/// `send_id` is a lookup reference, not an ownership relation: events are
/// retained as raw analytics even if the campaign row has been pruned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterEvent {
    pub id: i64,
    pub send_id: i64,
    pub event_type: TrackingEventType,
    /// Original (pre-tracking) destination URL; click events only.
    pub link_url: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated engagement counts for one campaign.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEngagement {
    pub opens: i64,
    pub clicks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_round_trip() {
        assert_eq!(TrackingEventType::parse("open"), Some(TrackingEventType::Open));
        assert_eq!(TrackingEventType::parse("CLICK"), Some(TrackingEventType::Click));
        assert_eq!(TrackingEventType::parse("bounce"), None);
    }

    #[test]
    fn test_event_serialization() {
        let event = NewsletterEvent {
            id: 1,
            send_id: 7,
            event_type: TrackingEventType::Click,
            link_url: Some("https://example.com".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"eventType\":\"click\""));
        assert!(json.contains("\"linkUrl\":\"https://example.com\""));
    }
}
