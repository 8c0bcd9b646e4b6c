//! Background Jobs for the Counselbase API
//!
//! This module contains background tasks spawned at server startup:
//!
//! - `autosave`: Debounced persistence of session-note drafts
//!
//! # Usage
//!
//! ```ignore
//! use counsel_api::jobs::autosave_task;
//! use tokio::sync::{mpsc, watch};
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let (autosave_tx, autosave_rx) = mpsc::channel(256);
//!
//! tokio::spawn(autosave_task(storage, debounce, autosave_rx, shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod autosave;

// Re-export commonly used types
pub use autosave::{autosave_task, AutosaveMetrics, AutosaveRequest};
