//! The wishlist store: one authoritative, observable collection per process
//!
//! Consumers share a cloned [`WishlistStore`] handle. Reads and mutations are
//! synchronous and never touch storage; the durable copy is read once by
//! [`WishlistStore::initialize`] and refreshed afterwards by a background
//! writer that always persists the whole current collection.

pub mod config;
pub mod snapshot;
mod writer;

pub use config::{DEFAULT_STORAGE_KEY, WishlistConfig};
pub use snapshot::{WishlistSnapshot, WishlistView};

use crate::core::{IdEquality, ItemId, Result, WishlistItem};
use crate::storage::{DurableStore, StoredFormat, decode_items};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{Instrument, Level, event, info_span};
use writer::{PersistWriter, WriterCounters, WriterSettings, spawn_persist_writer, wait_for_revision};

/// How initialization went. Every variant leaves the store ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored yet
    Absent,
    /// Stored entries accepted; `dropped` failed validation or repeated an id
    Loaded {
        kept: usize,
        dropped: usize,
        format: StoredFormat,
    },
    /// Stored blob unusable; started empty
    Malformed { reason: String },
    /// Storage read failed; started empty
    ReadFailed { reason: String },
    /// `initialize` had already been called on this store
    AlreadyInitialized,
}

/// Result of [`WishlistStore::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
    /// No id, or the store is not ready yet
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
pub struct WishlistStats {
    pub storage_key: String,
    pub ready: bool,
    pub item_count: usize,
    pub revision: u64,
    pub persisted_revision: u64,
    pub writes_succeeded: u64,
    pub writes_failed: u64,
    pub last_write_error: Option<String>,
}

struct StoreInner {
    storage: Arc<dyn DurableStore>,
    config: WishlistConfig,
    view_tx: watch::Sender<WishlistView>,
    /// Held for the whole load; `true` once the ready view is published.
    initialized: AsyncMutex<bool>,
    writer: Mutex<Option<PersistWriter>>,
    counters: Arc<WriterCounters>,
}

/// Shared handle to the wishlist. Clones refer to the same collection.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<StoreInner>,
}

impl WishlistStore {
    /// Creates a store that reports `Loading` until [`initialize`](Self::initialize) runs.
    pub fn new(storage: Arc<dyn DurableStore>, config: WishlistConfig) -> Result<Self> {
        config.validate()?;
        let (view_tx, _) = watch::channel(WishlistView::Loading);

        Ok(Self {
            inner: Arc::new(StoreInner {
                storage,
                config,
                view_tx,
                initialized: AsyncMutex::new(false),
                writer: Mutex::new(None),
                counters: Arc::new(WriterCounters::default()),
            }),
        })
    }

    /// Creates and initializes a store in one step.
    pub async fn open(storage: Arc<dyn DurableStore>, config: WishlistConfig) -> Result<Self> {
        let store = Self::new(storage, config)?;
        store.initialize().await;
        Ok(store)
    }

    pub fn config(&self) -> &WishlistConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Loads the durable copy and marks the store ready.
    ///
    /// Never fails: absent, unreadable or malformed data all start the
    /// session with an empty collection. Must run inside a tokio runtime,
    /// since it spawns the writer task.
    ///
    /// Concurrent callers wait for the first one. If a call is cancelled
    /// before the load finishes, the next call starts over.
    pub async fn initialize(&self) -> LoadOutcome {
        let mut initialized = self.inner.initialized.lock().await;
        if *initialized {
            event!(Level::DEBUG, "wishlist already initialized");
            return LoadOutcome::AlreadyInitialized;
        }

        let span = info_span!("wishlist.load", key = %self.inner.config.storage_key);
        let (items, outcome) = self.load().instrument(span).await;

        // subscribe before publishing so the writer cannot miss a mutation
        let views = self.inner.view_tx.subscribe();
        let writer = spawn_persist_writer(
            WriterSettings {
                storage: self.inner.storage.clone(),
                key: self.inner.config.storage_key.clone(),
                format: self.inner.config.persist_format,
                debounce: self.inner.config.write_debounce,
            },
            views,
            self.inner.counters.clone(),
        );
        *self.writer_slot() = Some(writer);

        self.inner
            .view_tx
            .send_replace(WishlistView::Ready(WishlistSnapshot::new(0, items)));
        *initialized = true;

        outcome
    }

    async fn load(&self) -> (Vec<WishlistItem>, LoadOutcome) {
        let key = &self.inner.config.storage_key;

        let bytes = match self.inner.storage.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                event!(Level::DEBUG, "no stored wishlist; starting empty");
                return (Vec::new(), LoadOutcome::Absent);
            }
            Err(err) => {
                event!(Level::WARN, error = %err, "failed to read stored wishlist; starting empty");
                return (
                    Vec::new(),
                    LoadOutcome::ReadFailed {
                        reason: err.to_string(),
                    },
                );
            }
        };

        match decode_items(&bytes, self.inner.config.id_equality) {
            Ok(decoded) => {
                let dropped = decoded.dropped();
                if dropped > 0 {
                    event!(
                        Level::WARN,
                        invalid = decoded.dropped_invalid,
                        duplicates = decoded.dropped_duplicates,
                        "dropped stored wishlist entries"
                    );
                }
                event!(Level::INFO, items = decoded.items.len(), "wishlist loaded");
                let outcome = LoadOutcome::Loaded {
                    kept: decoded.items.len(),
                    dropped,
                    format: decoded.format,
                };
                (decoded.items, outcome)
            }
            Err(err) => {
                event!(Level::WARN, error = %err, "stored wishlist is malformed; starting empty");
                (
                    Vec::new(),
                    LoadOutcome::Malformed {
                        reason: err.to_string(),
                    },
                )
            }
        }
    }

    /// Waits until the write for the current revision has been attempted.
    ///
    /// Returns immediately when nothing is pending or the writer is not running.
    pub async fn flush(&self) {
        let revision = self.snapshot().revision();
        let progress = self.writer_slot().as_ref().map(PersistWriter::progress);
        if let Some(progress) = progress {
            wait_for_revision(progress, revision).await;
        }
    }

    /// Flushes pending writes, then stops the writer.
    ///
    /// Later mutations still apply in memory but are no longer persisted.
    pub async fn shutdown(&self) {
        self.flush().await;
        let writer = self.writer_slot().take();
        if let Some(writer) = writer {
            writer.stop().await;
        }
    }

    fn writer_slot(&self) -> std::sync::MutexGuard<'_, Option<PersistWriter>> {
        self.inner
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_ready(&self) -> bool {
        self.inner.view_tx.borrow().is_ready()
    }

    pub fn view(&self) -> WishlistView {
        self.inner.view_tx.borrow().clone()
    }

    /// Current collection; empty while loading.
    pub fn snapshot(&self) -> WishlistSnapshot {
        self.inner
            .view_tx
            .borrow()
            .snapshot()
            .cloned()
            .unwrap_or_default()
    }

    /// Membership under the configured id equality. False while loading.
    pub fn has(&self, id: &ItemId) -> bool {
        let equality = self.equality();
        self.inner
            .view_tx
            .borrow()
            .snapshot()
            .is_some_and(|snapshot| snapshot.contains(id, equality))
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receives the `Loading -> Ready` transition and every later snapshot.
    pub fn subscribe(&self) -> watch::Receiver<WishlistView> {
        self.inner.view_tx.subscribe()
    }

    pub fn stats(&self) -> WishlistStats {
        let view = self.view();
        let snapshot = view.snapshot().cloned().unwrap_or_default();
        WishlistStats {
            storage_key: self.inner.config.storage_key.clone(),
            ready: view.is_ready(),
            item_count: snapshot.len(),
            revision: snapshot.revision(),
            persisted_revision: self.inner.counters.persisted_revision(),
            writes_succeeded: self.inner.counters.succeeded(),
            writes_failed: self.inner.counters.failed(),
            last_write_error: self.inner.counters.last_error(),
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Appends `item` unless its id is missing or already present.
    ///
    /// Returns whether the collection changed.
    pub fn add(&self, item: WishlistItem) -> bool {
        let Some(id) = item.id.clone() else {
            event!(Level::DEBUG, name = %item.name, "ignoring wishlist item without id");
            return false;
        };
        let equality = self.equality();
        let item = item.sanitized();

        self.mutate("add", |snapshot| {
            if snapshot.contains(&id, equality) {
                return None;
            }
            let mut next = snapshot.to_vec();
            next.push(item);
            Some(next)
        })
    }

    /// Removes the entry with `id`, if any. Returns whether it was present.
    pub fn remove(&self, id: &ItemId) -> bool {
        let equality = self.equality();
        self.mutate("remove", |snapshot| {
            let position = snapshot.position(id, equality)?;
            let mut next = snapshot.to_vec();
            next.remove(position);
            Some(next)
        })
    }

    /// Removes the entry if present, otherwise adds it.
    pub fn toggle(&self, item: WishlistItem) -> Toggled {
        let Some(id) = item.id.clone() else {
            event!(Level::DEBUG, name = %item.name, "ignoring wishlist toggle without id");
            return Toggled::Ignored;
        };
        let equality = self.equality();
        let mut toggled = Toggled::Ignored;

        self.mutate("toggle", |snapshot| {
            let mut next = snapshot.to_vec();
            match snapshot.position(&id, equality) {
                Some(position) => {
                    next.remove(position);
                    toggled = Toggled::Removed;
                }
                None => {
                    next.push(item.sanitized());
                    toggled = Toggled::Added;
                }
            }
            Some(next)
        });

        toggled
    }

    /// Empties the collection. Always persisted, even when already empty.
    pub fn clear(&self) {
        self.mutate("clear", |_| Some(Vec::new()));
    }

    fn equality(&self) -> IdEquality {
        self.inner.config.id_equality
    }

    /// Applies `change` to the current snapshot under the channel lock.
    ///
    /// `change` returns the next item list, or `None` for a no-op. Observers
    /// and the writer are notified only when something changed.
    fn mutate<F>(&self, operation: &'static str, change: F) -> bool
    where
        F: FnOnce(&WishlistSnapshot) -> Option<Vec<WishlistItem>>,
    {
        let mut loading = false;

        let changed = self.inner.view_tx.send_if_modified(|view| {
            let WishlistView::Ready(snapshot) = view else {
                loading = true;
                return false;
            };
            match change(&*snapshot) {
                Some(items) => {
                    *snapshot = WishlistSnapshot::new(snapshot.revision() + 1, items);
                    true
                }
                None => false,
            }
        });

        if loading {
            event!(Level::WARN, operation, "wishlist mutation ignored while loading");
        } else if changed {
            event!(Level::TRACE, operation, "wishlist mutated");
        }
        changed
    }
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore")
            .field("storage_key", &self.inner.config.storage_key)
            .field("view", &*self.inner.view_tx.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    async fn ready_store() -> (WishlistStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        let store = WishlistStore::open(storage.clone(), WishlistConfig::default())
            .await
            .unwrap();
        (store, storage)
    }

    #[tokio::test]
    async fn test_loading_until_initialized() {
        let storage = Arc::new(MemoryStore::new());
        let store = WishlistStore::new(storage.clone(), WishlistConfig::default()).unwrap();

        assert!(!store.is_ready());
        assert!(matches!(store.view(), WishlistView::Loading));
        assert!(!store.add(WishlistItem::new(1, "early", 1.0)));
        assert!(!store.has(&ItemId::from(1)));
        assert_eq!(store.toggle(WishlistItem::new(1, "early", 1.0)), Toggled::Ignored);

        assert_eq!(store.initialize().await, LoadOutcome::Absent);
        assert!(store.is_ready());
        assert!(store.is_empty());
        assert_eq!(store.initialize().await, LoadOutcome::AlreadyInitialized);

        store.flush().await;
        assert_eq!(storage.put_count(), 0);
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (store, _) = ready_store().await;

        assert!(store.add(WishlistItem::new(101, "Cá hồi", 50000.0)));
        assert!(!store.add(WishlistItem::new(101, "Cá hồi", 50000.0)));
        assert_eq!(store.len(), 1);
        assert!(store.has(&ItemId::from(101)));
        assert_eq!(store.snapshot().revision(), 1);
    }

    #[tokio::test]
    async fn test_add_without_id_is_ignored() {
        let (store, _) = ready_store().await;
        store.add(WishlistItem::new(1, "kept", 1.0));

        assert!(!store.add(WishlistItem::without_id("ghost", 5.0)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot().revision(), 1);
    }

    #[tokio::test]
    async fn test_add_sanitizes_price() {
        let (store, _) = ready_store().await;
        store.add(WishlistItem::new(1, "odd", -10.0));
        assert_eq!(store.snapshot()[0].price, 0.0);
    }

    #[tokio::test]
    async fn test_remove_keeps_order_of_others() {
        let (store, _) = ready_store().await;
        store.add(WishlistItem::new(101, "Cá hồi", 50000.0));
        store.add(WishlistItem::new("202", "Tôm", 80000.0));
        store.add(WishlistItem::new(303, "Mực", 60000.0));

        assert!(store.remove(&ItemId::from(101)));
        assert!(!store.remove(&ItemId::from(101)));

        let ids: Vec<_> = store.snapshot().ids().cloned().collect();
        assert_eq!(ids, vec![ItemId::from("202"), ItemId::from(303)]);
    }

    #[tokio::test]
    async fn test_toggle() {
        let (store, _) = ready_store().await;
        let item = WishlistItem::new(7, "Rau", 15000.0);

        assert_eq!(store.toggle(item.clone()), Toggled::Added);
        assert!(store.has(&ItemId::from(7)));
        assert_eq!(store.toggle(item), Toggled::Removed);
        assert!(!store.has(&ItemId::from(7)));
        assert_eq!(store.toggle(WishlistItem::without_id("x", 0.0)), Toggled::Ignored);
    }

    #[tokio::test]
    async fn test_clear_bumps_revision() {
        let (store, _) = ready_store().await;
        store.add(WishlistItem::new(1, "a", 1.0));
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.snapshot().revision(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_mutations() {
        let storage = Arc::new(MemoryStore::new());
        let store = WishlistStore::new(storage, WishlistConfig::default()).unwrap();
        let mut rx = store.subscribe();
        assert!(!rx.borrow_and_update().is_ready());

        store.initialize().await;
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_ready());

        store.add(WishlistItem::new(1, "a", 1.0));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().snapshot().map(|s| s.len()), Some(1));

        // no-op mutations do not notify
        store.add(WishlistItem::new(1, "a", 1.0));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_snapshots_are_isolated_from_later_mutations() {
        let (store, _) = ready_store().await;
        store.add(WishlistItem::new(1, "a", 1.0));
        let before = store.snapshot();
        store.add(WishlistItem::new(2, "b", 2.0));

        assert_eq!(before.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_stats_after_flush() {
        let (store, _) = ready_store().await;
        store.add(WishlistItem::new(1, "a", 1.0));
        store.flush().await;

        let stats = store.stats();
        assert!(stats.ready);
        assert_eq!(stats.item_count, 1);
        assert_eq!(stats.revision, 1);
        assert_eq!(stats.persisted_revision, 1);
        assert_eq!(stats.writes_succeeded, 1);
        assert_eq!(stats.writes_failed, 0);
        assert_eq!(stats.storage_key, DEFAULT_STORAGE_KEY);
    }
}
