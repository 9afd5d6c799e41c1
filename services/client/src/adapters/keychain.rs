//! services/client/src/adapters/keychain.rs
//!
//! A file-per-key `SecureStorage` implementation rooted at a configured
//! directory. Stands in for the platform keychain on targets where one is
//! not reachable; the client only ever stores the auth token and the
//! serialized current-user record through it.

use std::path::PathBuf;

use async_trait::async_trait;
use eventbook_core::ports::{SecureStorage, StorageError, StorageResult};

pub struct FileKeychain {
    root: PathBuf,
}

impl FileKeychain {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.root.join(safe)
    }
}

#[async_trait]
impl SecureStorage for FileKeychain {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        match tokio::fs::read_to_string(self.entry_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err.to_string())),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        tokio::fs::write(self.entry_path(key), value)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_and_removes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let keychain = FileKeychain::new(dir.path());

        assert_eq!(keychain.get_item("auth_token").await.unwrap(), None);
        keychain.set_item("auth_token", "tok.1.42").await.unwrap();
        assert_eq!(
            keychain.get_item("auth_token").await.unwrap().as_deref(),
            Some("tok.1.42")
        );

        keychain.remove_item("auth_token").await.unwrap();
        assert_eq!(keychain.get_item("auth_token").await.unwrap(), None);
        // Removing a missing key is not an error.
        keychain.remove_item("auth_token").await.unwrap();
    }

    #[tokio::test]
    async fn keys_are_sanitized_into_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let keychain = FileKeychain::new(dir.path());
        keychain.set_item("../escape/attempt", "x").await.unwrap();
        assert!(dir.path().join("___escape_attempt").exists());
    }
}
