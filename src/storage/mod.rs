pub mod engine;
pub mod file;
pub mod memory;
pub mod persistence;

pub use engine::DurableStore;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use persistence::{
    DecodedWishlist, ENVELOPE_VERSION, PersistFormat, StoredFormat, decode_items, encode_items,
};
