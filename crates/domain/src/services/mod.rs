//! Domain services for the Encore backend.
//!
//! Services contain the pure, non-IO business logic: turning an authored
//! campaign into a finished, tracking-instrumented HTML email.

pub mod render;
pub mod tracking;

pub use render::{apply_merge_tags, render_campaign, sanitize_html};
pub use tracking::{inject_open_pixel, instrument_html, wrap_links_with_tracking};
