//! Newsletter event repository.
//!
//! Append-only inserts from the tracking collector plus read access for the
//! admin surface. Each write is a single independent insert with no
//! read-modify-write, so the collector is safe under arbitrary concurrency.

use sqlx::PgPool;

use crate::entities::NewsletterEventEntity;
use domain::models::{SendEngagement, TrackingEventType};

const EVENT_COLUMNS: &str = "id, send_id, event_type, link_url, user_agent, created_at";

/// Repository for newsletter event operations.
pub struct NewsletterEventRepository {
    pool: PgPool,
}

impl NewsletterEventRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one engagement ping. Never mutated afterwards.
    pub async fn record(
        &self,
        send_id: i64,
        event_type: TrackingEventType,
        link_url: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<NewsletterEventEntity, sqlx::Error> {
        let entity = sqlx::query_as::<_, NewsletterEventEntity>(&format!(
            r#"
            INSERT INTO newsletter_events (send_id, event_type, link_url, user_agent)
            VALUES ($1, $2, $3, $4)
            RETURNING {EVENT_COLUMNS}
            "#,
        ))
        .bind(send_id)
        .bind(event_type.as_str())
        .bind(link_url)
        .bind(user_agent)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    /// List recent events for one send, newest first.
    pub async fn list_by_send(
        &self,
        send_id: i64,
        limit: i64,
    ) -> Result<Vec<NewsletterEventEntity>, sqlx::Error> {
        let entities = sqlx::query_as::<_, NewsletterEventEntity>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM newsletter_events
            WHERE send_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        ))
        .bind(send_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities)
    }

    /// Aggregate open/click counts for one send.
    pub async fn engagement(&self, send_id: i64) -> Result<SendEngagement, sqlx::Error> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE event_type = 'open'),
                COUNT(*) FILTER (WHERE event_type = 'click')
            FROM newsletter_events
            WHERE send_id = $1
            "#,
        )
        .bind(send_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(SendEngagement {
            opens: row.0,
            clicks: row.1,
        })
    }
}
