//! Newsletter send repository.
//!
//! Provides data access for campaign rows, including the atomic claim that
//! hands a due campaign to exactly one processor pass.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::entities::NewsletterSendEntity;
use domain::models::{SendKind, SendStatus};

const SEND_COLUMNS: &str = "id, subject, kind, body_html, poster_url, poster_text, \
     button_text, button_link, status, scheduled_at, sent_at, error, campaign_id, created_at";

/// Field set for inserting a new campaign row.
#[derive(Debug, Clone)]
pub struct CreateSendParams {
    pub subject: String,
    pub kind: SendKind,
    pub body_html: Option<String>,
    pub poster_url: Option<String>,
    pub poster_text: Option<String>,
    pub button_text: Option<String>,
    pub button_link: Option<String>,
    /// `Sending` for immediate delivery, `Scheduled` for deferred.
    pub status: SendStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Repository for newsletter send operations.
pub struct NewsletterSendRepository {
    pool: PgPool,
}

impl NewsletterSendRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new campaign row.
    pub async fn create(
        &self,
        params: &CreateSendParams,
    ) -> Result<NewsletterSendEntity, sqlx::Error> {
        let entity = sqlx::query_as::<_, NewsletterSendEntity>(&format!(
            r#"
            INSERT INTO newsletter_sends
                (subject, kind, body_html, poster_url, poster_text,
                 button_text, button_link, status, scheduled_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SEND_COLUMNS}
            "#,
        ))
        .bind(&params.subject)
        .bind(params.kind.as_str())
        .bind(&params.body_html)
        .bind(&params.poster_url)
        .bind(&params.poster_text)
        .bind(&params.button_text)
        .bind(&params.button_link)
        .bind(params.status.as_str())
        .bind(params.scheduled_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    /// Find a send by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<NewsletterSendEntity>, sqlx::Error> {
        let entity = sqlx::query_as::<_, NewsletterSendEntity>(&format!(
            r#"SELECT {SEND_COLUMNS} FROM newsletter_sends WHERE id = $1"#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity)
    }

    /// List sends for the admin surface, newest first.
    pub async fn list(&self, limit: i64) -> Result<Vec<NewsletterSendEntity>, sqlx::Error> {
        let entities = sqlx::query_as::<_, NewsletterSendEntity>(&format!(
            r#"
            SELECT {SEND_COLUMNS}
            FROM newsletter_sends
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities)
    }

    /// Atomically claim up to `batch_size` due campaigns.
    ///
    /// One statement performs select-and-transition: only rows still in
    /// `scheduled` with `scheduled_at <= now` are moved to `sending`, and
    /// `FOR UPDATE SKIP LOCKED` guarantees two overlapping passes claim
    /// disjoint sets. The claim is never assumed to fall out of store
    /// defaults.
    pub async fn claim_due(
        &self,
        now: DateTime<Utc>,
        batch_size: i64,
    ) -> Result<Vec<NewsletterSendEntity>, sqlx::Error> {
        let entities = sqlx::query_as::<_, NewsletterSendEntity>(&format!(
            r#"
            UPDATE newsletter_sends
            SET status = 'sending'
            WHERE id IN (
                SELECT id FROM newsletter_sends
                WHERE status = 'scheduled' AND scheduled_at <= $1
                ORDER BY scheduled_at ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {SEND_COLUMNS}
            "#,
        ))
        .bind(now)
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities)
    }

    /// Record the ESP's campaign identifier as soon as the upstream create
    /// succeeds, independent of later send or schedule success.
    pub async fn set_campaign_id(&self, id: i64, campaign_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(r#"UPDATE newsletter_sends SET campaign_id = $2 WHERE id = $1"#)
            .bind(id)
            .bind(campaign_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Transition `sending -> sent`: stamps `sent_at`, clears `error`.
    pub async fn mark_sent(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE newsletter_sends
            SET status = 'sent', sent_at = NOW(), error = NULL
            WHERE id = $1 AND status = 'sending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Transition `sending -> error`, recording the failure message.
    pub async fn mark_failed(&self, id: i64, message: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE newsletter_sends
            SET status = 'error', error = $2
            WHERE id = $1 AND status = 'sending'
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Conditional transition `scheduled -> cancelled`.
    ///
    /// Returns the number of rows affected: zero means the row was not in a
    /// cancellable state (or does not exist) at write time.
    pub async fn cancel(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE newsletter_sends
            SET status = 'cancelled'
            WHERE id = $1 AND status = 'scheduled'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete a send and its events, regardless of status.
    ///
    /// Events carry no foreign key, so the cascade is explicit and runs in
    /// one transaction.
    pub async fn delete(&self, id: i64) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(r#"DELETE FROM newsletter_events WHERE send_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(r#"DELETE FROM newsletter_sends WHERE id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }
}
