//! HTTP route handlers.

pub mod health;
pub mod newsletter;
pub mod track;
