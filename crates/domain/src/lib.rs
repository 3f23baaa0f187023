//! Domain layer for the Encore backend.
//!
//! This crate contains:
//! - Newsletter campaign and tracking models
//! - The email template renderer and tracking injector

pub mod models;
pub mod services;
