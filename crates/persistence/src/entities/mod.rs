//! Database entity definitions.

pub mod newsletter_event;
pub mod newsletter_send;

pub use newsletter_event::NewsletterEventEntity;
pub use newsletter_send::NewsletterSendEntity;
