//! Session-Notes Autosave Background Task
//!
//! Counsellors edit session notes continuously; persisting every keystroke
//! would hammer storage. This task debounces draft updates: a draft is saved
//! only after it has been stable for the configured window (default 1000 ms),
//! at most one save per stable period. Drafts equal to the last saved value
//! are skipped entirely.
//!
//! Save failures are logged and swallowed; there is no retry guarantee. The
//! client's explicit save (PATCH) remains the durable path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use counsel_core::EntityId;
use counsel_storage::{SessionUpdate, Storage};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

// ============================================================================
// REQUEST
// ============================================================================

/// One draft update queued for autosave.
#[derive(Debug, Clone, PartialEq)]
pub struct AutosaveRequest {
    /// Session whose notes are being edited
    pub session_id: EntityId,
    /// The draft fields to persist
    pub update: SessionUpdate,
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for autosave activity.
#[derive(Debug, Default)]
pub struct AutosaveMetrics {
    /// Drafts flushed to storage since startup
    pub saves_flushed: AtomicU64,

    /// Drafts skipped because they matched the last saved value
    pub saves_deduplicated: AtomicU64,

    /// Flushes that failed and were dropped
    pub save_failures: AtomicU64,
}

impl AutosaveMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Per-session draft waiting out its debounce window.
struct PendingDraft {
    update: SessionUpdate,
    deadline: Instant,
}

/// Background task that debounces and persists session-note drafts.
///
/// Runs until the shutdown signal is received, then flushes whatever is
/// still pending before returning its metrics.
///
/// # Arguments
///
/// * `storage` - Storage backend the drafts are written to
/// * `debounce` - Stability window before a draft is persisted
/// * `rx` - Channel of incoming draft updates
/// * `shutdown_rx` - Watch receiver for shutdown signal
pub async fn autosave_task(
    storage: Arc<dyn Storage>,
    debounce: Duration,
    mut rx: mpsc::Receiver<AutosaveRequest>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<AutosaveMetrics> {
    let metrics = Arc::new(AutosaveMetrics::new());
    let mut pending: HashMap<EntityId, PendingDraft> = HashMap::new();
    let mut last_saved: HashMap<EntityId, SessionUpdate> = HashMap::new();

    tracing::info!(debounce_ms = debounce.as_millis() as u64, "Autosave task started");

    loop {
        // Sleep until the earliest pending deadline; park when idle.
        let next_deadline = pending.values().map(|d| d.deadline).min();
        let debounce_timer = async {
            match next_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!(pending = pending.len(), "Autosave task shutting down");
                    break;
                }
            }

            request = rx.recv() => {
                match request {
                    Some(request) => {
                        accept_draft(request, debounce, &mut pending, &last_saved, &metrics);
                    }
                    // All senders dropped; nothing more will arrive.
                    None => break,
                }
            }

            _ = debounce_timer => {
                flush_due(
                    storage.as_ref(),
                    &mut pending,
                    &mut last_saved,
                    &metrics,
                )
                .await;
            }
        }
    }

    // Final flush so a stable draft is not lost on clean shutdown.
    for (session_id, draft) in pending.drain() {
        save_draft(storage.as_ref(), session_id, draft.update, &mut last_saved, &metrics).await;
    }

    tracing::info!(
        saves_flushed = metrics.saves_flushed.load(Ordering::Relaxed),
        saves_deduplicated = metrics.saves_deduplicated.load(Ordering::Relaxed),
        save_failures = metrics.save_failures.load(Ordering::Relaxed),
        "Autosave task completed"
    );

    metrics
}

/// Fold an incoming draft into the pending map.
fn accept_draft(
    request: AutosaveRequest,
    debounce: Duration,
    pending: &mut HashMap<EntityId, PendingDraft>,
    last_saved: &HashMap<EntityId, SessionUpdate>,
    metrics: &AutosaveMetrics,
) {
    // A draft identical to what storage already holds needs no save at all.
    if pending.get(&request.session_id).is_none()
        && last_saved.get(&request.session_id) == Some(&request.update)
    {
        metrics.saves_deduplicated.fetch_add(1, Ordering::Relaxed);
        return;
    }

    match pending.get_mut(&request.session_id) {
        // Unchanged draft: the value is stable, keep the running deadline.
        Some(draft) if draft.update == request.update => {}
        // New or changed draft: restart the stability window.
        Some(draft) => {
            draft.update = request.update;
            draft.deadline = Instant::now() + debounce;
        }
        None => {
            pending.insert(
                request.session_id,
                PendingDraft {
                    update: request.update,
                    deadline: Instant::now() + debounce,
                },
            );
        }
    }
}

/// Flush every pending draft whose debounce window has elapsed.
async fn flush_due(
    storage: &dyn Storage,
    pending: &mut HashMap<EntityId, PendingDraft>,
    last_saved: &mut HashMap<EntityId, SessionUpdate>,
    metrics: &AutosaveMetrics,
) {
    let now = Instant::now();
    let due: Vec<EntityId> = pending
        .iter()
        .filter(|(_, draft)| draft.deadline <= now)
        .map(|(id, _)| *id)
        .collect();

    for session_id in due {
        if let Some(draft) = pending.remove(&session_id) {
            save_draft(storage, session_id, draft.update, last_saved, metrics).await;
        }
    }
}

/// Persist one draft, swallowing failures.
async fn save_draft(
    storage: &dyn Storage,
    session_id: EntityId,
    update: SessionUpdate,
    last_saved: &mut HashMap<EntityId, SessionUpdate>,
    metrics: &AutosaveMetrics,
) {
    if last_saved.get(&session_id) == Some(&update) {
        metrics.saves_deduplicated.fetch_add(1, Ordering::Relaxed);
        return;
    }

    match storage.session_update(session_id, update.clone()).await {
        Ok(_) => {
            metrics.saves_flushed.fetch_add(1, Ordering::Relaxed);
            last_saved.insert(session_id, update);
            tracing::debug!(%session_id, "Autosaved session draft");
        }
        Err(e) => {
            metrics.save_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(%session_id, error = %e, "Autosave failed; draft dropped");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_core::{new_entity_id, Branch, CounsellingSession, Section, SlotKey};
    use counsel_storage::{MemoryStorage, SlotSpec};

    async fn seeded_session(storage: &MemoryStorage) -> CounsellingSession {
        let counsellor = counsel_core::Counsellor {
            counsellor_id: new_entity_id(),
            name: "Dr. Rao".to_string(),
            email: "rao@college.edu".to_string(),
            phone: None,
            department: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let specs = [SlotSpec {
            key: SlotKey {
                year: 2,
                semester: 1,
                branch: Branch::Cse,
                section: Section::A,
            },
            max_students: 10,
        }];
        storage.counsellor_register(&counsellor, &specs).await.unwrap();

        let student = counsel_core::Student {
            student_id: new_entity_id(),
            roll_no: "19CS001".to_string(),
            name: "Asha".to_string(),
            email: "asha@college.edu".to_string(),
            year: 2,
            semester: 1,
            branch: Branch::Cse,
            section: Section::A,
            counsellor_id: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        storage.student_insert(&student).await.unwrap();

        let session = CounsellingSession {
            session_id: new_entity_id(),
            counsellor_id: counsellor.counsellor_id,
            student_id: student.student_id,
            held_at: chrono::Utc::now(),
            summary: "initial".to_string(),
            follow_up: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        storage.session_insert(&session).await.unwrap();
        session
    }

    fn draft(session_id: EntityId, summary: &str) -> AutosaveRequest {
        AutosaveRequest {
            session_id,
            update: SessionUpdate {
                held_at: None,
                summary: Some(summary.to_string()),
                follow_up: None,
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stable_draft_is_saved_after_the_window() {
        let storage = Arc::new(MemoryStorage::new());
        let session = seeded_session(&storage).await;

        let (tx, rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(autosave_task(
            storage.clone() as Arc<dyn Storage>,
            Duration::from_millis(1000),
            rx,
            shutdown_rx,
        ));

        tx.send(draft(session.session_id, "draft one")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let saved = storage.session_get(session.session_id).await.unwrap().unwrap();
        assert_eq!(saved.summary, "draft one");

        shutdown_tx.send(true).unwrap();
        let metrics = handle.await.unwrap();
        assert_eq!(metrics.saves_flushed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn changed_draft_restarts_the_window() {
        let storage = Arc::new(MemoryStorage::new());
        let session = seeded_session(&storage).await;

        let (tx, rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(autosave_task(
            storage.clone() as Arc<dyn Storage>,
            Duration::from_millis(1000),
            rx,
            shutdown_rx,
        ));

        tx.send(draft(session.session_id, "first")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        // Still inside the window; nothing saved yet.
        assert_eq!(
            storage.session_get(session.session_id).await.unwrap().unwrap().summary,
            "initial"
        );

        tx.send(draft(session.session_id, "second")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        // The first window was cancelled by the change.
        assert_eq!(
            storage.session_get(session.session_id).await.unwrap().unwrap().summary,
            "initial"
        );

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(
            storage.session_get(session.session_id).await.unwrap().unwrap().summary,
            "second"
        );

        shutdown_tx.send(true).unwrap();
        let metrics = handle.await.unwrap();
        // Only the final stable value reached storage.
        assert_eq!(metrics.saves_flushed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn redundant_draft_is_deduplicated() {
        let storage = Arc::new(MemoryStorage::new());
        let session = seeded_session(&storage).await;

        let (tx, rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(autosave_task(
            storage.clone() as Arc<dyn Storage>,
            Duration::from_millis(1000),
            rx,
            shutdown_rx,
        ));

        tx.send(draft(session.session_id, "same")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        // The identical draft arrives again after the save.
        tx.send(draft(session.session_id, "same")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        shutdown_tx.send(true).unwrap();
        let metrics = handle.await.unwrap();
        assert_eq!(metrics.saves_flushed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.saves_deduplicated.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_logged_and_swallowed() {
        let storage = Arc::new(MemoryStorage::new());
        // No session seeded; the update will fail with SessionNotFound.
        let (tx, rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(autosave_task(
            storage.clone() as Arc<dyn Storage>,
            Duration::from_millis(1000),
            rx,
            shutdown_rx,
        ));

        tx.send(draft(new_entity_id(), "orphan draft")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        shutdown_tx.send(true).unwrap();
        let metrics = handle.await.unwrap();
        assert_eq!(metrics.save_failures.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.saves_flushed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_draft() {
        let storage = Arc::new(MemoryStorage::new());
        let session = seeded_session(&storage).await;

        let (tx, rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(autosave_task(
            storage.clone() as Arc<dyn Storage>,
            Duration::from_millis(1000),
            rx,
            shutdown_rx,
        ));

        tx.send(draft(session.session_id, "almost lost")).await.unwrap();
        // Give the task a moment to accept the draft, then shut down before
        // the window elapses.
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(
            storage.session_get(session.session_id).await.unwrap().unwrap().summary,
            "almost lost"
        );
    }
}
