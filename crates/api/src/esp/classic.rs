//! Classic (legacy key-based) ESP API.
//!
//! Campaign creation is a two-step flow: create the draft, then upload its
//! content. This generation has no deferred-delivery verb, so `Schedule`
//! requests degrade to `Draft` and the caller learns the honored mode from
//! the dispatch return value.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use super::{require_configured, upstream_message, DeliveryAdapter, DispatchMode, EspError,
    EspVariant};
use crate::config::EspConfig;

pub struct ClassicEsp {
    config: EspConfig,
    client: Client,
}

impl ClassicEsp {
    pub fn new(config: EspConfig) -> Result<Self, EspError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.classic_api_url.trim_end_matches('/'), path)
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

/// Create-draft payload for the classic API.
pub(crate) fn create_payload(config: &EspConfig, subject: &str) -> serde_json::Value {
    serde_json::json!({
        "subject": subject,
        "from": config.from_email,
        "from_name": config.from_name,
        "type": "regular",
    })
}

/// Content-upload payload. The plain-text part is the ESP's fallback for
/// clients that refuse HTML.
pub(crate) fn content_payload(html: &str) -> serde_json::Value {
    serde_json::json!({
        "html": html,
        "plain": "View this email in an HTML-capable client. {$unsubscribe}",
    })
}

#[async_trait]
impl DeliveryAdapter for ClassicEsp {
    fn variant(&self) -> EspVariant {
        EspVariant::Classic
    }

    fn supports_scheduling(&self) -> bool {
        false
    }

    async fn create(&self, subject: &str, html: &str) -> Result<String, EspError> {
        require_configured(&self.config)?;

        let response = self
            .client
            .post(self.url("campaigns"))
            .header("X-MailerLite-ApiKey", &self.config.credential)
            .json(&create_payload(&self.config, subject))
            .send()
            .await?;
        let response = self.check(response).await?;

        let body: serde_json::Value = response.json().await?;
        let campaign_id = body
            .get("id")
            .map(json_id_to_string)
            .ok_or_else(|| EspError::Upstream {
                status: 200,
                message: "Create response missing campaign id".to_string(),
            })?;

        // Content upload is part of creation; a draft without content is
        // useless, so clean it up if this step fails.
        let content = self
            .client
            .put(self.url(&format!("campaigns/{}/content", campaign_id)))
            .header("X-MailerLite-ApiKey", &self.config.credential)
            .json(&content_payload(html))
            .send()
            .await?;

        if let Err(err) = self.check(content).await {
            if let Err(cleanup) = self.delete(&campaign_id).await {
                warn!(campaign_id = %campaign_id, error = %cleanup, "Failed to clean up empty draft");
            }
            return Err(err);
        }

        debug!(campaign_id = %campaign_id, "Classic ESP campaign created");
        Ok(campaign_id)
    }

    async fn dispatch(
        &self,
        campaign_id: &str,
        mode: DispatchMode,
        _scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<DispatchMode, EspError> {
        require_configured(&self.config)?;

        match mode {
            DispatchMode::Draft => Ok(DispatchMode::Draft),
            DispatchMode::Schedule => {
                // No upstream scheduling verb in this generation. The
                // campaign stays a draft and the caller is told so.
                warn!(
                    campaign_id = %campaign_id,
                    "Classic ESP cannot schedule; campaign left as draft"
                );
                Ok(DispatchMode::Draft)
            }
            DispatchMode::Send => {
                let response = self
                    .client
                    .post(self.url(&format!("campaigns/{}/actions/send", campaign_id)))
                    .header("X-MailerLite-ApiKey", &self.config.credential)
                    .send()
                    .await?;
                self.check(response).await?;
                Ok(DispatchMode::Send)
            }
        }
    }

    async fn cancel(&self, campaign_id: &str) -> Result<(), EspError> {
        // Nothing is ever scheduled upstream with this variant; drafts have
        // nothing to cancel.
        debug!(campaign_id = %campaign_id, "Classic ESP cancel is a no-op");
        Ok(())
    }

    async fn delete(&self, campaign_id: &str) -> Result<(), EspError> {
        require_configured(&self.config)?;

        let response = self
            .client
            .delete(self.url(&format!("campaigns/{}", campaign_id)))
            .header("X-MailerLite-ApiKey", &self.config.credential)
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

/// Upstream ids arrive as numbers in this generation.
fn json_id_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EspConfig {
        EspConfig {
            credential: "0123456789abcdef0123456789abcdef".to_string(),
            from_email: "news@music.example.com".to_string(),
            from_name: "The Artist".to_string(),
            ..EspConfig::default()
        }
    }

    #[test]
    fn test_create_payload_carries_sender_identity() {
        let payload = create_payload(&config(), "Tour dates");
        assert_eq!(payload["subject"], "Tour dates");
        assert_eq!(payload["from"], "news@music.example.com");
        assert_eq!(payload["from_name"], "The Artist");
        assert_eq!(payload["type"], "regular");
    }

    #[test]
    fn test_content_payload_includes_plain_fallback() {
        let payload = content_payload("<p>Hi</p>");
        assert_eq!(payload["html"], "<p>Hi</p>");
        assert!(payload["plain"].as_str().unwrap().contains("{$unsubscribe}"));
    }

    #[test]
    fn test_json_id_to_string() {
        assert_eq!(json_id_to_string(&serde_json::json!(12345)), "12345");
        assert_eq!(json_id_to_string(&serde_json::json!("abc")), "abc");
    }

    #[tokio::test]
    async fn test_classic_does_not_support_scheduling() {
        let esp = ClassicEsp::new(config()).unwrap();
        assert!(!esp.supports_scheduling());
        assert_eq!(esp.variant(), EspVariant::Classic);

        // Schedule degrades to draft without any network call.
        let honored = esp
            .dispatch("42", DispatchMode::Schedule, Some(Utc::now()))
            .await
            .unwrap();
        assert_eq!(honored, DispatchMode::Draft);
    }

    #[tokio::test]
    async fn test_unconfigured_create_fails_fast() {
        let esp = ClassicEsp::new(EspConfig::default()).unwrap();
        let err = esp.create("Subject", "<p>Hi</p>").await.unwrap_err();
        assert!(matches!(err, EspError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_cancel_is_noop() {
        let esp = ClassicEsp::new(config()).unwrap();
        assert!(esp.cancel("42").await.is_ok());
    }
}
