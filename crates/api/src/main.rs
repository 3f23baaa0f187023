use anyhow::Result;
use std::time::Duration;
use tracing::info;

use encore_api::{app, config, jobs, middleware};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging);

    info!("Starting Encore API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let adapter = encore_api::esp::build_adapter(&config.esp)?;

    // Optional in-process processor timer; the external cron endpoint works
    // either way and overlap is safe.
    let mut scheduler = jobs::JobScheduler::new();
    if config.newsletter.internal_scheduler {
        scheduler.register(jobs::NewsletterProcessJob::new(
            pool.clone(),
            adapter.clone(),
            config.server.public_base_url.clone(),
            config.newsletter.batch_size,
            config.newsletter.process_interval_minutes,
        ));
        scheduler.start();
    }

    let addr = config.socket_addr()?;
    let app = app::create_app(config, pool, adapter);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;

    Ok(())
}
