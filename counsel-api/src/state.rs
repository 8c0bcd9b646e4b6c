//! Shared application state for Axum routers.

use std::sync::Arc;

use counsel_storage::Storage;
use tokio::sync::mpsc;

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::jobs::autosave::AutosaveRequest;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend. `MemoryStorage` in development and tests; a database
    /// backed implementation slots in behind the same trait.
    pub storage: Arc<dyn Storage>,
    pub auth_config: AuthConfig,
    pub api_config: ApiConfig,
    /// Channel into the autosave worker. Draft saves are queued here and
    /// flushed after the debounce window.
    pub autosave_tx: mpsc::Sender<AutosaveRequest>,
    pub start_time: std::time::Instant,
}

// Use macro to reduce boilerplate for FromRef implementations
crate::impl_from_ref!(Arc<dyn Storage>, storage);
crate::impl_from_ref!(AuthConfig, auth_config);
crate::impl_from_ref!(ApiConfig, api_config);
crate::impl_from_ref!(mpsc::Sender<AutosaveRequest>, autosave_tx);
crate::impl_from_ref!(std::time::Instant, start_time);

#[cfg(test)]
impl AppState {
    /// State for router tests: default configs over the given storage.
    /// The receiver is handed back so draft tests can observe the queue.
    pub(crate) fn for_tests(
        storage: Arc<dyn Storage>,
    ) -> (Self, mpsc::Receiver<AutosaveRequest>) {
        let (autosave_tx, autosave_rx) = mpsc::channel(16);
        (
            Self {
                storage,
                auth_config: AuthConfig::default(),
                api_config: ApiConfig::default(),
                autosave_tx,
                start_time: std::time::Instant::now(),
            },
            autosave_rx,
        )
    }
}
