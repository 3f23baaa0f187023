//! Background job scheduler and job implementations.
//!
//! The external cron trigger is the primary way processor passes happen;
//! the in-process job is an optional convenience for deployments without
//! one. Overlap between the two is safe.

mod newsletter_process;
mod scheduler;

pub use newsletter_process::NewsletterProcessJob;
pub use scheduler::{Job, JobScheduler};
