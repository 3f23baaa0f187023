//! Newsletter scheduler/processor.
//!
//! One externally triggered pass that advances all due work: claim a batch
//! of due campaigns, render and instrument each one, hand it to the ESP,
//! and persist the terminal state. Stateless between invocations.
//!
//! Overlapping invocations are expected (a retried cron timer, or the
//! in-process job racing the external trigger). The repository's atomic
//! claim guarantees two passes pick up disjoint rows, so a campaign reaches
//! the ESP's create call at most once.

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::esp::{DeliveryAdapter, DispatchMode, EspError};
use domain::models::{NewsletterSend, ProcessSummary};
use domain::services::render_campaign;
use persistence::repositories::NewsletterSendRepository;

/// Why a delivery attempt failed. The message is what gets written to the
/// campaign's error field, verbatim for upstream rejections.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<EspError> for DeliveryError {
    fn from(err: EspError) -> Self {
        match err {
            EspError::NotConfigured(msg) => DeliveryError::Configuration(msg),
            EspError::Upstream { message, .. } => DeliveryError::Upstream(message),
            EspError::Http(e) => DeliveryError::Upstream(e.to_string()),
        }
    }
}

/// Result of delivering one campaign.
#[derive(Debug)]
pub struct DeliveryOutcome {
    /// Upstream id, present whenever the ESP create call succeeded, even if
    /// a later step failed.
    pub campaign_id: Option<String>,
    pub error: Option<DeliveryError>,
}

impl DeliveryOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Service that turns claimed campaigns into ESP deliveries.
pub struct NewsletterProcessor {
    pool: PgPool,
    adapter: Arc<dyn DeliveryAdapter>,
    base_url: String,
    batch_size: i64,
}

impl NewsletterProcessor {
    pub fn new(
        pool: PgPool,
        adapter: Arc<dyn DeliveryAdapter>,
        base_url: String,
        batch_size: i64,
    ) -> Self {
        Self {
            pool,
            adapter,
            base_url,
            batch_size,
        }
    }

    /// One processor pass: claim due campaigns and deliver each one
    /// independently. A row's failure is recorded on that row and the loop
    /// continues; it never aborts the batch.
    pub async fn run(&self) -> Result<ProcessSummary, sqlx::Error> {
        let repo = NewsletterSendRepository::new(self.pool.clone());
        let claimed = repo.claim_due(Utc::now(), self.batch_size).await?;

        let mut summary = ProcessSummary::default();

        for entity in claimed {
            summary.processed += 1;
            let send: NewsletterSend = entity.into();
            let outcome = self.deliver(&send).await;

            if outcome.succeeded() {
                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
        }

        if summary.processed > 0 {
            info!(
                processed = summary.processed,
                sent = summary.sent,
                failed = summary.failed,
                "Processor pass completed"
            );
        }

        Ok(summary)
    }

    /// Deliver one claimed campaign (status must already be `sending`) and
    /// persist its terminal state.
    pub async fn deliver(&self, send: &NewsletterSend) -> DeliveryOutcome {
        let repo = NewsletterSendRepository::new(self.pool.clone());

        match self.forward(&repo, send).await {
            Ok(campaign_id) => {
                if let Err(e) = repo.mark_sent(send.id).await {
                    // The ESP accepted the campaign but the terminal state
                    // did not stick; surface loudly, the row is now stale.
                    error!(send_id = send.id, error = %e, "Failed to mark campaign sent");
                }
                info!(
                    send_id = send.id,
                    campaign_id = %campaign_id,
                    "Campaign delivered to ESP"
                );
                DeliveryOutcome {
                    campaign_id: Some(campaign_id),
                    error: None,
                }
            }
            Err((campaign_id, err)) => {
                if let Err(e) = repo.mark_failed(send.id, &err.to_string()).await {
                    error!(send_id = send.id, error = %e, "Failed to record campaign error");
                }
                warn!(
                    send_id = send.id,
                    error = %err,
                    "Campaign delivery failed"
                );
                DeliveryOutcome {
                    campaign_id,
                    error: Some(err),
                }
            }
        }
    }

    /// Render, instrument, create and dispatch. On failure the already
    /// obtained campaign id rides along so the caller still has it.
    async fn forward(
        &self,
        repo: &NewsletterSendRepository,
        send: &NewsletterSend,
    ) -> Result<String, (Option<String>, DeliveryError)> {
        let html = render_campaign(send, &self.base_url);

        let campaign_id = self
            .adapter
            .create(&send.subject, &html)
            .await
            .map_err(|e| (None, DeliveryError::from(e)))?;

        // Persist the upstream id before dispatching so it survives a
        // dispatch failure and stays available for later cancel/delete.
        repo.set_campaign_id(send.id, &campaign_id)
            .await
            .map_err(|e| {
                (
                    Some(campaign_id.clone()),
                    DeliveryError::Database(e.to_string()),
                )
            })?;

        let honored = self
            .adapter
            .dispatch(&campaign_id, DispatchMode::Send, None)
            .await
            .map_err(|e| (Some(campaign_id.clone()), DeliveryError::from(e)))?;

        if honored != DispatchMode::Send {
            warn!(
                send_id = send.id,
                campaign_id = %campaign_id,
                honored = honored.as_str(),
                "ESP honored a different dispatch mode"
            );
        }

        Ok(campaign_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_esp_error_mapping() {
        let err: DeliveryError = EspError::NotConfigured("no credential".to_string()).into();
        assert!(matches!(err, DeliveryError::Configuration(_)));

        let err: DeliveryError = EspError::Upstream {
            status: 422,
            message: "Subject is required".to_string(),
        }
        .into();
        match &err {
            DeliveryError::Upstream(msg) => assert_eq!(msg, "Subject is required"),
            other => panic!("unexpected: {other:?}"),
        }
        // The upstream message is preserved verbatim for the error column.
        assert_eq!(err.to_string(), "Subject is required");
    }

    #[test]
    fn test_outcome_succeeded() {
        let ok = DeliveryOutcome {
            campaign_id: Some("42".to_string()),
            error: None,
        };
        assert!(ok.succeeded());

        let failed = DeliveryOutcome {
            campaign_id: Some("42".to_string()),
            error: Some(DeliveryError::Upstream("rejected".to_string())),
        };
        assert!(!failed.succeeded());
        // A failed outcome can still carry the id obtained from create.
        assert!(failed.campaign_id.is_some());
    }
}
