use moodmate::session::log_events;
use moodmate::{router, AppConfig, AppState, JsonFileStore};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let store = Arc::new(JsonFileStore::open(config.data_path.clone()).await?);
    info!(path = %store.path().display(), "opened data file");
    let state = AppState::new(store, &config)?;

    let (stop_log, stop) = oneshot::channel();
    let session_log = tokio::spawn(log_events(state.sessions.subscribe(), stop));

    let sessions = state.sessions.clone();
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sessions.close_all().await;
    let _ = stop_log.send(());
    if let Err(err) = session_log.await {
        warn!("session event logger failed: {err}");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
