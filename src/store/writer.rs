use super::snapshot::{WishlistSnapshot, WishlistView};
use crate::storage::{DurableStore, PersistFormat, encode_items};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{Instrument, Level, event, info_span};

/// Outcome counters shared between the writer task and `stats()`.
#[derive(Debug, Default)]
pub(crate) struct WriterCounters {
    succeeded: AtomicU64,
    failed: AtomicU64,
    persisted_revision: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl WriterCounters {
    pub(crate) fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub(crate) fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Revision of the newest snapshot that reached storage.
    pub(crate) fn persisted_revision(&self) -> u64 {
        self.persisted_revision.load(Ordering::Acquire)
    }

    pub(crate) fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_success(&self, revision: u64) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.persisted_revision.fetch_max(revision, Ordering::AcqRel);
    }

    fn record_failure(&self, message: String) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
    }
}

pub(crate) struct WriterSettings {
    pub(crate) storage: Arc<dyn DurableStore>,
    pub(crate) key: String,
    pub(crate) format: PersistFormat,
    pub(crate) debounce: Option<Duration>,
}

/// Background task persisting the latest snapshot.
///
/// The view channel holds a single slot, so a burst of mutations made while a
/// write is in flight collapses into one follow-up write of the newest state.
pub(crate) struct PersistWriter {
    progress: watch::Receiver<u64>,
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl PersistWriter {
    /// Revision of the last snapshot a write was attempted for.
    pub(crate) fn progress(&self) -> watch::Receiver<u64> {
        self.progress.clone()
    }

    /// Signals the writer to stop and waits for its final write.
    pub(crate) async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            if let Err(err) = join_handle.await {
                event!(Level::WARN, error = %err, "wishlist writer join failed");
            }
        }
    }
}

impl Drop for PersistWriter {
    fn drop(&mut self) {
        // the task still flushes whatever is pending before it exits
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

/// Waits until a write covering `revision` has been attempted.
pub(crate) async fn wait_for_revision(mut progress: watch::Receiver<u64>, revision: u64) {
    // Err means the task is gone; nothing left to wait for
    let _ = progress.wait_for(|persisted| *persisted >= revision).await;
}

/// Spawns the writer. `views` must be subscribed before the loaded state is
/// published so no mutation slips past unobserved; revision 0 (the loaded
/// state itself) is never written back.
pub(crate) fn spawn_persist_writer(
    settings: WriterSettings,
    mut views: watch::Receiver<WishlistView>,
    counters: Arc<WriterCounters>,
) -> PersistWriter {
    let (progress_tx, progress) = watch::channel(0u64);
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let join_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    break;
                }
                changed = views.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if let Some(delay) = settings.debounce {
                        sleep(delay).await;
                    }
                    write_latest(&settings, &mut views, &progress_tx, &counters).await;
                }
            }
        }

        write_latest(&settings, &mut views, &progress_tx, &counters).await;
        event!(Level::DEBUG, key = %settings.key, "wishlist writer stopped");
    });

    PersistWriter {
        progress,
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
    }
}

async fn write_latest(
    settings: &WriterSettings,
    views: &mut watch::Receiver<WishlistView>,
    progress_tx: &watch::Sender<u64>,
    counters: &WriterCounters,
) {
    let latest: Option<WishlistSnapshot> = views.borrow_and_update().snapshot().cloned();
    let Some(snapshot) = latest else {
        return;
    };
    if snapshot.revision() <= *progress_tx.borrow() {
        return;
    }

    let span = info_span!(
        "wishlist.persist",
        key = %settings.key,
        revision = snapshot.revision(),
        items = snapshot.len(),
    );

    let result: crate::core::Result<()> = async {
        let bytes = encode_items(snapshot.items(), settings.format)?;
        settings.storage.put(&settings.key, &bytes).await
    }
    .instrument(span)
    .await;

    match result {
        Ok(()) => {
            counters.record_success(snapshot.revision());
            event!(Level::DEBUG, revision = snapshot.revision(), "wishlist persisted");
        }
        Err(err) => {
            event!(
                Level::ERROR,
                key = %settings.key,
                revision = snapshot.revision(),
                error = %err,
                "failed to persist wishlist; in-memory state stays authoritative"
            );
            counters.record_failure(err.to_string());
        }
    }

    // attempted, successful or not
    progress_tx.send_replace(snapshot.revision());
}
