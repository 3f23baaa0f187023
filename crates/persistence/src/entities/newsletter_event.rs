//! Newsletter event entity definitions.
//!
//! Maps to the append-only newsletter_events table. Rows reference a send by
//! id without a foreign key: the collector may record pings for campaigns
//! that were already pruned.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::{NewsletterEvent, TrackingEventType};

/// Database entity for the newsletter_events table.
#[derive(Debug, Clone, FromRow)]
pub struct NewsletterEventEntity {
    pub id: i64,
    pub send_id: i64,
    pub event_type: String,
    pub link_url: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<NewsletterEventEntity> for NewsletterEvent {
    fn from(entity: NewsletterEventEntity) -> Self {
        let event_type =
            TrackingEventType::parse(&entity.event_type).unwrap_or(TrackingEventType::Open);

        NewsletterEvent {
            id: entity.id,
            send_id: entity.send_id,
            event_type,
            link_url: entity.link_url,
            user_agent: entity.user_agent,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_to_model_conversion() {
        let entity = NewsletterEventEntity {
            id: 10,
            send_id: 7,
            event_type: "click".to_string(),
            link_url: Some("https://example.com".to_string()),
            user_agent: Some("curl/8.0".to_string()),
            created_at: Utc::now(),
        };

        let model: NewsletterEvent = entity.into();
        assert_eq!(model.event_type, TrackingEventType::Click);
        assert_eq!(model.send_id, 7);
    }
}
