use crate::core::{IdEquality, Result, WishlistError};
use crate::storage::PersistFormat;
use std::time::Duration;

/// Key the mobile app namespaced its wishlist under.
pub const DEFAULT_STORAGE_KEY: &str = "@app_wishlist";

/// Wishlist store configuration
#[derive(Debug, Clone)]
pub struct WishlistConfig {
    /// Durable key holding the serialized collection
    pub storage_key: String,

    /// How ids are compared for membership and deduplication
    pub id_equality: IdEquality,

    /// Quiet period the writer waits before persisting, coalescing bursts
    pub write_debounce: Option<Duration>,

    /// Shape of the persisted blob
    pub persist_format: PersistFormat,
}

impl WishlistConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            id_equality: IdEquality::Strict,
            write_debounce: None,
            persist_format: PersistFormat::Envelope,
        }
    }

    /// Set the storage key
    pub fn storage_key(mut self, key: &str) -> Self {
        self.storage_key = key.to_string();
        self
    }

    /// Set the id equality mode
    pub fn id_equality(mut self, equality: IdEquality) -> Self {
        self.id_equality = equality;
        self
    }

    /// Set the write debounce interval
    pub fn write_debounce(mut self, debounce: Duration) -> Self {
        self.write_debounce = Some(debounce);
        self
    }

    /// Set the persisted format
    pub fn persist_format(mut self, format: PersistFormat) -> Self {
        self.persist_format = format;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(WishlistError::Config(
                "storage_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for WishlistConfig {
    fn default() -> Self {
        Self::new()
    }
}
