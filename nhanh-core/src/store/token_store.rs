//! Persistence of [`TokenRecord`]s.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{Secret, SecretStore, StoreError};
use crate::model::AppId;
use crate::token::TokenRecord;

/// Storage collaborator for the OAuth flow.
///
/// A store holds at most one current record; saving replaces it.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a record, replacing any previous one.
    async fn save(&self, record: &TokenRecord) -> Result<(), StoreError>;

    /// Load the current record.
    ///
    /// Returns `Ok(None)` if nothing has been persisted yet.
    async fn load(&self) -> Result<Option<TokenRecord>, StoreError>;

    /// Remove the current record. Idempotent.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Storage key for the token of an application inside a [`SecretStore`].
pub fn token_key(app_id: &AppId) -> String {
    format!("nhanh/{}/access_token", app_id.as_str())
}

/// Token store writing the record as a JSON file.
///
/// The default location is `~/.config/nhanh/token.json` on Linux,
/// the equivalent application-support directory on macOS and
/// `%APPDATA%\nhanh\token.json` on Windows.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Platform default path for the token file.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("vn", "nhanh", "nhanh")
            .ok_or(StoreError::ConfigDirUnavailable)?;
        Ok(dirs.config_dir().join("token.json"))
    }

    /// Create a store at the platform default path.
    pub fn at_default_path() -> Result<Self, StoreError> {
        Ok(Self::new(Self::default_path()?))
    }

    /// The file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn save(&self, record: &TokenRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&self.path, contents).await?;

        tracing::debug!(path = %self.path.display(), "token record written");
        Ok(())
    }

    async fn load(&self) -> Result<Option<TokenRecord>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Token store keeping the serialized record in any [`SecretStore`].
pub struct SecretTokenStore<S: SecretStore> {
    store: S,
    key: String,
}

impl<S: SecretStore> SecretTokenStore<S> {
    /// Create a token store for `app_id` on top of `store`.
    pub fn new(store: S, app_id: &AppId) -> Self {
        Self {
            store,
            key: token_key(app_id),
        }
    }

    /// The underlying secret store.
    pub fn inner(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: SecretStore> TokenStore for SecretTokenStore<S> {
    async fn save(&self, record: &TokenRecord) -> Result<(), StoreError> {
        let serialized = Secret::new(serde_json::to_string(record)?);
        self.store.set(&self.key, &serialized).await
    }

    async fn load(&self) -> Result<Option<TokenRecord>, StoreError> {
        match self.store.get(&self.key).await? {
            Some(secret) => Ok(Some(serde_json::from_str(secret.expose())?)),
            None => Ok(None),
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BusinessId;
    use crate::store::MemoryStore;
    use crate::token::TokenPolicy;
    use tempfile::TempDir;

    fn sample() -> TokenRecord {
        TokenRecord::issue(
            "token-value",
            AppId::new("A1"),
            BusinessId::new("B1"),
            &TokenPolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = FileTokenStore::new(temp.path().join("nested/token.json"));

        assert!(store.load().await.unwrap().is_none());

        let record = sample();
        store.save(&record).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileTokenStore::new(path).load().await;
        assert!(matches!(result, Err(StoreError::SerializationError(_))));
    }

    #[tokio::test]
    async fn test_file_store_clear_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = FileTokenStore::new(temp.path().join("token.json"));

        store.save(&sample()).await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_secret_token_store_uses_app_key() {
        let store = SecretTokenStore::new(MemoryStore::new(), &AppId::new("A1"));
        store.save(&sample()).await.unwrap();

        assert!(store.inner().exists("nhanh/A1/access_token").await.unwrap());
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token.expose(), "token-value");
    }
}
