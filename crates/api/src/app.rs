use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::esp::DeliveryAdapter;
use crate::middleware::{require_admin, require_processor_secret};
use crate::routes::{health, newsletter, track};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub adapter: Arc<dyn DeliveryAdapter>,
}

pub fn create_app(config: Config, pool: PgPool, adapter: Arc<dyn DeliveryAdapter>) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        pool,
        config: config.clone(),
        adapter,
    };

    // Tracking URLs are embedded in emails and opened from anywhere.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Author-facing routes (require the admin bearer token)
    let admin_routes = Router::new()
        .route("/api/v1/newsletter/send", post(newsletter::send_newsletter))
        .route("/api/v1/newsletter", get(newsletter::list_newsletters))
        .route(
            "/api/v1/newsletter/:id",
            get(newsletter::get_newsletter).delete(newsletter::delete_newsletter),
        )
        .route(
            "/api/v1/newsletter/:id/cancel",
            post(newsletter::cancel_newsletter),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Processor trigger (external cron, shared secret header)
    let processor_routes = Router::new()
        .route(
            "/api/v1/newsletter/process",
            post(newsletter::process_newsletters),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_processor_secret,
        ));

    // Public routes: tracking collector and health probes
    let public_routes = Router::new()
        .route("/track/open", get(track::track_open))
        .route("/track/click", get(track::track_click))
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(processor_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
