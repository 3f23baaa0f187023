//! Application services.

pub mod processor;

pub use processor::{DeliveryError, DeliveryOutcome, NewsletterProcessor};
