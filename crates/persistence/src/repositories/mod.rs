//! Repository implementations.

pub mod newsletter_event;
pub mod newsletter_send;

pub use newsletter_event::NewsletterEventRepository;
pub use newsletter_send::{CreateSendParams, NewsletterSendRepository};
