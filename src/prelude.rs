//! Recommended imports grouped by abstraction level.
//!
//! `app` covers what a consumer holding the store needs.
//! `storage` is the escape hatch for custom backends and blob inspection.

pub mod app {
    //! Store handle, item types and the collaborators that feed it.
    pub use crate::catalog::{CatalogProduct, ProductVariant, default_variant};
    pub use crate::core::{IdEquality, ItemId, WishlistItem};
    pub use crate::session::{SessionProvider, StoredSession, User, require_user};
    pub use crate::store::{
        LoadOutcome, Toggled, WishlistConfig, WishlistSnapshot, WishlistStore, WishlistView,
    };
}

pub mod storage {
    //! Durable backends and the persisted blob format.
    pub use crate::storage::{
        DecodedWishlist, DurableStore, FileStore, MemoryStore, PersistFormat, StoredFormat,
        decode_items, encode_items,
    };
}
