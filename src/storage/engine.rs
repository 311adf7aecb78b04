use crate::core::Result;
use async_trait::async_trait;

/// Durable key-value backend - allows pluggable storage for the wishlist blob
///
/// Every method takes `&self`; implementations use interior mutability so a
/// single backend can be shared between the loader and the writer task.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Read the blob stored under `key`, `None` if the key was never written
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the blob stored under `key`
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`; succeeds when the key does not exist
    async fn delete(&self, key: &str) -> Result<()>;
}
