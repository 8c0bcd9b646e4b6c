//! Counselbase API Server Entry Point
//!
//! Bootstraps configuration, the in-memory store, and the autosave
//! worker, then starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use counsel_api::{
    autosave_task, create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig,
};
use counsel_storage::{MemoryStorage, Storage};
use tokio::sync::{mpsc, watch};

// Drafts queued beyond this are rejected with 503 rather than buffered.
const AUTOSAVE_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> ApiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counsel_api=info,tower_http=info".into()),
        )
        .init();

    let api_config = ApiConfig::from_env();
    let auth_config = AuthConfig::from_env();

    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

    let (autosave_tx, autosave_rx) = mpsc::channel(AUTOSAVE_QUEUE_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let autosave_handle = tokio::spawn(autosave_task(
        storage.clone(),
        api_config.autosave_debounce,
        autosave_rx,
        shutdown_rx,
    ));

    let addr: SocketAddr = api_config.bind_addr.parse().map_err(|e| {
        ApiError::invalid_input(format!("Invalid bind address {}: {}", api_config.bind_addr, e))
    })?;

    let state = AppState {
        storage,
        auth_config,
        api_config,
        autosave_tx,
        start_time: std::time::Instant::now(),
    };
    let app = create_api_router(state)?;

    tracing::info!(%addr, "Starting Counselbase API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    // ConnectInfo supplies the client address the rate limiter keys on.
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    // Let the autosave worker flush pending drafts before exit.
    let _ = shutdown_tx.send(true);
    if let Err(e) = autosave_handle.await {
        tracing::warn!(error = %e, "Autosave worker did not shut down cleanly");
    }

    Ok(())
}
