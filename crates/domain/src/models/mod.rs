//! Domain models for the Encore backend.

pub mod newsletter;
pub mod tracking;

pub use newsletter::{
    CreateSendRequest, NewsletterSend, ProcessSummary, SendKind, SendMode, SendResponse,
    SendStatus,
};
pub use tracking::{NewsletterEvent, SendEngagement, TrackingEventType};
