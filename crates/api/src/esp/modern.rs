//! Modern (token-based) ESP API.
//!
//! Single-call campaign creation with embedded content, bearer
//! authorization, and true deferred delivery via the schedule endpoint's
//! date plus time-of-day encoding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use super::{encode_schedule, require_configured, upstream_message, DeliveryAdapter, DispatchMode,
    EspError, EspVariant};
use crate::config::EspConfig;

pub struct ModernEsp {
    config: EspConfig,
    client: Client,
}

impl ModernEsp {
    pub fn new(config: EspConfig) -> Result<Self, EspError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.modern_api_url.trim_end_matches('/'), path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.credential)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, EspError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(upstream_message(status.as_u16(), &body))
    }
}

/// Create payload for the modern API: content travels with the campaign.
pub(crate) fn create_payload(
    config: &EspConfig,
    subject: &str,
    html: &str,
) -> serde_json::Value {
    serde_json::json!({
        "name": subject,
        "type": "regular",
        "emails": [{
            "subject": subject,
            "from": config.from_email,
            "from_name": config.from_name,
            "content": html,
        }],
    })
}

/// Schedule-endpoint payload for immediate or deferred delivery.
pub(crate) fn dispatch_payload(
    mode: DispatchMode,
    scheduled_at: Option<DateTime<Utc>>,
) -> Option<serde_json::Value> {
    match (mode, scheduled_at) {
        (DispatchMode::Send, _) => Some(serde_json::json!({ "delivery": "instant" })),
        (DispatchMode::Schedule, Some(at)) => {
            let (date, hours, minutes) = encode_schedule(at);
            Some(serde_json::json!({
                "delivery": "scheduled",
                "schedule": {
                    "date": date,
                    "hours": hours,
                    "minutes": minutes,
                },
            }))
        }
        _ => None,
    }
}

#[async_trait]
impl DeliveryAdapter for ModernEsp {
    fn variant(&self) -> EspVariant {
        EspVariant::Modern
    }

    fn supports_scheduling(&self) -> bool {
        true
    }

    async fn create(&self, subject: &str, html: &str) -> Result<String, EspError> {
        require_configured(&self.config)?;

        let response = self
            .client
            .post(self.url("campaigns"))
            .header("Authorization", self.bearer())
            .json(&create_payload(&self.config, subject, html))
            .send()
            .await?;
        let response = self.check(response).await?;

        let body: serde_json::Value = response.json().await?;
        let campaign_id = body
            .pointer("/data/id")
            .map(|id| match id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| EspError::Upstream {
                status: 200,
                message: "Create response missing campaign id".to_string(),
            })?;

        debug!(campaign_id = %campaign_id, "Modern ESP campaign created");
        Ok(campaign_id)
    }

    async fn dispatch(
        &self,
        campaign_id: &str,
        mode: DispatchMode,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<DispatchMode, EspError> {
        require_configured(&self.config)?;

        if mode == DispatchMode::Schedule && scheduled_at.is_none() {
            warn!(campaign_id = %campaign_id, "Schedule requested without a timestamp; leaving draft");
            return Ok(DispatchMode::Draft);
        }

        let payload = match dispatch_payload(mode, scheduled_at) {
            Some(payload) => payload,
            None => return Ok(DispatchMode::Draft),
        };

        let response = self
            .client
            .post(self.url(&format!("campaigns/{}/schedule", campaign_id)))
            .header("Authorization", self.bearer())
            .json(&payload)
            .send()
            .await?;
        self.check(response).await?;

        Ok(mode)
    }

    async fn cancel(&self, campaign_id: &str) -> Result<(), EspError> {
        require_configured(&self.config)?;

        let response = self
            .client
            .post(self.url(&format!("campaigns/{}/cancel", campaign_id)))
            .header("Authorization", self.bearer())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(campaign_id = %campaign_id, "Nothing to cancel upstream");
            return Ok(());
        }
        self.check(response).await?;
        Ok(())
    }

    async fn delete(&self, campaign_id: &str) -> Result<(), EspError> {
        require_configured(&self.config)?;

        let response = self
            .client
            .delete(self.url(&format!("campaigns/{}", campaign_id)))
            .header("Authorization", self.bearer())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(campaign_id = %campaign_id, "Campaign already gone upstream");
            return Ok(());
        }
        self.check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> EspConfig {
        EspConfig {
            credential: "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxIn0.c2ln".to_string(),
            from_email: "news@music.example.com".to_string(),
            from_name: "The Artist".to_string(),
            ..EspConfig::default()
        }
    }

    #[test]
    fn test_create_payload_embeds_content() {
        let payload = create_payload(&config(), "Tour dates", "<p>Hi</p>");
        assert_eq!(payload["name"], "Tour dates");
        assert_eq!(payload["emails"][0]["subject"], "Tour dates");
        assert_eq!(payload["emails"][0]["from"], "news@music.example.com");
        assert_eq!(payload["emails"][0]["content"], "<p>Hi</p>");
    }

    #[test]
    fn test_dispatch_payload_instant() {
        let payload = dispatch_payload(DispatchMode::Send, None).unwrap();
        assert_eq!(payload["delivery"], "instant");
    }

    #[test]
    fn test_dispatch_payload_scheduled_encoding() {
        let at = Utc.with_ymd_and_hms(2030, 6, 1, 18, 5, 0).unwrap();
        let payload = dispatch_payload(DispatchMode::Schedule, Some(at)).unwrap();
        assert_eq!(payload["delivery"], "scheduled");
        assert_eq!(payload["schedule"]["date"], "2030-06-01");
        assert_eq!(payload["schedule"]["hours"], "18");
        assert_eq!(payload["schedule"]["minutes"], "05");
    }

    #[test]
    fn test_dispatch_payload_draft_is_none() {
        assert!(dispatch_payload(DispatchMode::Draft, None).is_none());
        assert!(dispatch_payload(DispatchMode::Schedule, None).is_none());
    }

    #[tokio::test]
    async fn test_modern_supports_scheduling() {
        let esp = ModernEsp::new(config()).unwrap();
        assert!(esp.supports_scheduling());
        assert_eq!(esp.variant(), EspVariant::Modern);
    }

    #[tokio::test]
    async fn test_unconfigured_dispatch_fails_fast() {
        let esp = ModernEsp::new(EspConfig::default()).unwrap();
        let err = esp
            .dispatch("42", DispatchMode::Send, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EspError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_schedule_without_timestamp_degrades_to_draft() {
        let esp = ModernEsp::new(config()).unwrap();
        let honored = esp.dispatch("42", DispatchMode::Schedule, None).await.unwrap();
        assert_eq!(honored, DispatchMode::Draft);
    }
}
