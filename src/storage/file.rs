use super::DurableStore;
use crate::core::{Result, WishlistError};
use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-backed store: one file per key under a data directory.
///
/// Writes go to a temp file in the same directory which is then persisted
/// over the target, so readers never observe a partially written blob.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_key(key)))
    }
}

/// Escapes everything outside `[A-Za-z0-9._-]` as `%XX` so distinct keys map
/// to distinct file names on every platform.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

#[async_trait]
impl DurableStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(WishlistError::Io(format!(
                "Failed to read '{}': {}",
                path.display(),
                err
            ))),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root).await.map_err(|err| {
            WishlistError::Io(format!(
                "Failed to create data directory '{}': {}",
                self.root.display(),
                err
            ))
        })?;

        let root = self.root.clone();
        let target = self.path_for(key);
        let bytes = value.to_vec();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut temp = tempfile::NamedTempFile::new_in(&root).map_err(|err| {
                WishlistError::Io(format!("Failed to create temp file: {}", err))
            })?;
            temp.write_all(&bytes)
                .map_err(|err| WishlistError::Io(format!("Failed to write temp file: {}", err)))?;
            temp.as_file()
                .sync_all()
                .map_err(|err| WishlistError::Io(format!("Failed to sync temp file: {}", err)))?;
            temp.persist(&target).map_err(|err| {
                WishlistError::Io(format!(
                    "Failed to replace '{}': {}",
                    target.display(),
                    err.error
                ))
            })?;
            Ok(())
        })
        .await
        .map_err(|err| WishlistError::Storage(format!("write task join: {}", err)))?
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(WishlistError::Io(format!(
                "Failed to delete '{}': {}",
                path.display(),
                err
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("@app_wishlist"), "%40app_wishlist");
        assert_eq!(encode_key("user"), "user");
        assert_ne!(encode_key("a/b"), encode_key("a_b"));
    }

    #[tokio::test]
    async fn test_missing_key_reads_as_absent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        assert_eq!(store.get("@app_wishlist").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_replaces_whole_blob() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("nested"));

        store.put("@app_wishlist", b"[1,2,3]").await.unwrap();
        store.put("@app_wishlist", b"[]").await.unwrap();

        assert_eq!(store.get("@app_wishlist").await.unwrap(), Some(b"[]".to_vec()));
        assert!(store.path_for("@app_wishlist").exists());

        // no temp files left behind
        let leftovers = std::fs::read_dir(store.root()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        store.put("user", b"{}").await.unwrap();
        store.delete("user").await.unwrap();
        store.delete("user").await.unwrap();
        assert_eq!(store.get("user").await.unwrap(), None);
    }
}
