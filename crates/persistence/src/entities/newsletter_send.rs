//! Newsletter send entity definitions.
//!
//! Maps to the newsletter_sends table, one row per campaign.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::{NewsletterSend, SendKind, SendStatus};

/// Database entity for the newsletter_sends table.
#[derive(Debug, Clone, FromRow)]
pub struct NewsletterSendEntity {
    pub id: i64,
    pub subject: String,
    pub kind: String,
    pub body_html: Option<String>,
    pub poster_url: Option<String>,
    pub poster_text: Option<String>,
    pub button_text: Option<String>,
    pub button_link: Option<String>,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub campaign_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<NewsletterSendEntity> for NewsletterSend {
    fn from(entity: NewsletterSendEntity) -> Self {
        // kind and status are constrained by CHECK clauses in the schema;
        // the fallbacks here are unreachable for rows the store wrote.
        let kind = SendKind::parse(&entity.kind).unwrap_or(SendKind::Text);
        let status = SendStatus::parse(&entity.status).unwrap_or(SendStatus::Error);

        NewsletterSend {
            id: entity.id,
            subject: entity.subject,
            kind,
            body_html: entity.body_html,
            poster_url: entity.poster_url,
            poster_text: entity.poster_text,
            button_text: entity.button_text,
            button_link: entity.button_link,
            status,
            scheduled_at: entity.scheduled_at,
            sent_at: entity.sent_at,
            error: entity.error,
            campaign_id: entity.campaign_id,
            created_at: entity.created_at,
        }
    }
}
