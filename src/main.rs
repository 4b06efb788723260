use std::{net::SocketAddr, sync::Arc};
use study_tracker::interval::SystemClock;
use study_tracker::{AppState, Config, HttpSessionStore, Tracker, load_credentials, router};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    let credentials = load_credentials(&config.credentials_path).await;

    let store = HttpSessionStore::new(
        config.api_url.clone(),
        config.request_timeout,
        credentials.session_key,
    )?;
    let tracker = Tracker::new(Arc::new(store), Arc::new(SystemClock));

    if let Err(err) = tracker.refresh().await {
        warn!("initial load failed, will retry on the next resync: {err}");
    }
    let timers = tracker.spawn_timers(config.tick_interval, Some(config.resync_interval));

    let app = router(AppState::new(config.credentials_path.clone(), tracker));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!(api = %config.api_url, "listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    timers.cancel();
    info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
