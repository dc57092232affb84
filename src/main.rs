use std::sync::Arc;
use std::time::Duration;

use log::info;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use trainserver::api_router::configure_api_routes;
use trainserver::shared::config::AppConfig;
use trainserver::shared::state::AppState;
use trainserver::shared::utils::{create_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;
    let pool = create_conn(&config.database.url)?;
    run_migrations(&pool)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(pool, config));

    let app = configure_api_routes(state.clone())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Ctrl-C starts a graceful drain; in-flight requests get 10 seconds
/// before the process exits regardless.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("shutdown requested, draining for up to 10s");
    tokio::spawn(async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        log::warn!("drain window elapsed, exiting");
        std::process::exit(0);
    });
}
