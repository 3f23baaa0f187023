//! Shared utilities for the Encore backend.

pub mod secret;
pub mod validation;
