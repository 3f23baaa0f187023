pub mod app;
pub mod config;
pub mod error;
pub mod esp;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod services;
