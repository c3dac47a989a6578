//! Narrator API server entry point.

use std::error::Error;
use std::sync::Arc;

use narrator_api::config::ServerConfig;
use narrator_api::state::AppState;
use narrator_core::chat::SystemClock;
use narrator_core::store::StatePersistence;
use narrator_store::{InMemoryChatLog, JsonFilePersistence, MemoryPersistence, ReplicatedStateStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Narrator API server");

    let config = ServerConfig::from_env()?;

    let persistence: Arc<dyn StatePersistence> = match &config.state_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "persisting shared state to file");
            Arc::new(JsonFilePersistence::new(path))
        }
        None => Arc::new(MemoryPersistence::new()),
    };
    let store = Arc::new(ReplicatedStateStore::open(persistence).await);

    let (app_state, controller_task) = AppState::start(
        store,
        Arc::new(InMemoryChatLog::new()),
        Arc::new(SystemClock),
        config.settings.clone(),
    );
    let controller = app_state.controller.clone();

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = narrator_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("Shutting down narrator controller");
    controller.shutdown().await?;
    controller_task.await?;

    Ok(())
}
