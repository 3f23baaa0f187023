//! In-process newsletter processor job.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::scheduler::Job;
use crate::esp::DeliveryAdapter;
use crate::services::NewsletterProcessor;

/// Periodic processor pass for deployments without an external cron.
///
/// The claim in the store keeps this safe even when it overlaps the
/// external trigger.
pub struct NewsletterProcessJob {
    processor: NewsletterProcessor,
    interval_minutes: u64,
}

impl NewsletterProcessJob {
    pub fn new(
        pool: PgPool,
        adapter: Arc<dyn DeliveryAdapter>,
        base_url: String,
        batch_size: i64,
        interval_minutes: u64,
    ) -> Self {
        Self {
            processor: NewsletterProcessor::new(pool, adapter, base_url, batch_size),
            interval_minutes,
        }
    }
}

#[async_trait::async_trait]
impl Job for NewsletterProcessJob {
    fn name(&self) -> &'static str {
        "newsletter_process"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    async fn execute(&self) -> Result<(), String> {
        let summary = self.processor.run().await.map_err(|e| e.to_string())?;

        if summary.processed > 0 {
            info!(
                processed = summary.processed,
                sent = summary.sent,
                failed = summary.failed,
                "Scheduled processor pass delivered campaigns"
            );
        }

        Ok(())
    }
}
