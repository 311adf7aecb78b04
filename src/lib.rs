// ============================================================================
// Wishlist Store Library
// ============================================================================

pub mod catalog;
pub mod core;
pub mod prelude;
pub mod session;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use crate::core::{IdEquality, ItemId, Result, WishlistError, WishlistItem};
pub use crate::store::{
    DEFAULT_STORAGE_KEY, LoadOutcome, Toggled, WishlistConfig, WishlistSnapshot, WishlistStats,
    WishlistStore, WishlistView,
};

// Re-export storage backends
pub use crate::storage::{DurableStore, FileStore, MemoryStore, PersistFormat, StoredFormat};

// Re-export collaborators
pub use crate::catalog::{CatalogClient, CatalogProduct, ProductVariant};
pub use crate::session::{SessionProvider, StoredSession, User};

// ============================================================================
// File-backed convenience constructor
// ============================================================================

/// Opens a wishlist persisted under `data_dir` with default settings.
///
/// This is the usual entry point for an app: one call at startup, then the
/// returned handle is cloned into every consumer.
///
/// # Examples
///
/// ```
/// use wishlist_store::{ItemId, WishlistItem};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let dir = tempfile::TempDir::new()?;
/// let wishlist = wishlist_store::open_in_dir(dir.path()).await?;
///
/// wishlist.add(WishlistItem::new(101, "Cá hồi", 50000.0));
/// assert!(wishlist.has(&ItemId::from(101)));
///
/// wishlist.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub async fn open_in_dir<P: AsRef<std::path::Path>>(data_dir: P) -> Result<WishlistStore> {
    open_in_dir_with_config(data_dir, WishlistConfig::default()).await
}

/// Like [`open_in_dir`] with a custom configuration.
pub async fn open_in_dir_with_config<P: AsRef<std::path::Path>>(
    data_dir: P,
    config: WishlistConfig,
) -> Result<WishlistStore> {
    let storage = std::sync::Arc::new(FileStore::new(data_dir));
    WishlistStore::open(storage, config).await
}
