//! Secret and token storage.
//!
//! Access tokens obtained through the OAuth handshake are persisted by a
//! [`TokenStore`]:
//! - [`FileTokenStore`] - JSON file, by default in the platform config dir
//! - [`SecretTokenStore`] - any [`SecretStore`] backend ([`MemoryStore`], or
//!   `KeyringStore` with the `keyring-store` feature)
//!
//! # Storage Key Convention
//!
//! Token records kept in a [`SecretStore`] live under `nhanh/{app_id}/access_token`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(feature = "keyring-store")]
mod keyring;
mod memory;
mod token_store;

#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStore;
pub use memory::MemoryStore;
pub use token_store::{FileTokenStore, SecretTokenStore, TokenStore, token_key};

/// A credential (access token, secret key) that never shows up in logs.
///
/// `Debug` and `Display` print `[REDACTED]`; the value is read through
/// [`expose`](Secret::expose) and zeroed when dropped. Serializes as a plain
/// string so token files stay readable by other tools.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn into_inner(mut self) -> String {
        std::mem::take(&mut self.0)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Secret {}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Failure reading or writing persisted credentials.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend refused access to `key`.
    #[error("access denied to {key}")]
    AccessDenied { key: String },

    #[error("storage backend failure: {message}")]
    BackendError { message: String },

    #[error("token file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored token record is not valid JSON.
    #[error("malformed token record: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("OS keyring unavailable: {message}")]
    KeyringUnavailable { message: String },

    /// The platform has no per-user config directory.
    #[error("no configuration directory on this platform")]
    ConfigDirUnavailable,
}

/// Key/value backend holding [`Secret`]s.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// `Ok(None)` when `key` is absent.
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError>;

    /// Insert or overwrite.
    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError>;

    /// Remove `key`; absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.get(key).await.map(|found| found.is_some())
    }
}

#[async_trait]
impl<T: SecretStore + ?Sized> SecretStore for Box<T> {
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        (**self).set(key, secret).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key).await
    }
}

/// Service name used for keyring entries.
pub const KEYRING_SERVICE: &str = "nhanh-sdk";

/// Pick a secret backend for token records.
///
/// With `prefer_keyring` (and the `keyring-store` feature) the OS keyring is
/// used when it can be opened; otherwise tokens live in a [`MemoryStore`] for
/// the lifetime of the process.
pub fn create_store(prefer_keyring: bool) -> Box<dyn SecretStore> {
    #[cfg(feature = "keyring-store")]
    if prefer_keyring {
        match KeyringStore::try_new(KEYRING_SERVICE) {
            Ok(store) => {
                tracing::info!("storing tokens in the OS keyring");
                return Box::new(store);
            }
            Err(e) => tracing::warn!("{}; tokens will be kept in memory only", e),
        }
    }

    #[cfg(not(feature = "keyring-store"))]
    if prefer_keyring {
        tracing::warn!("built without keyring-store; tokens will be kept in memory only");
    }

    Box::new(MemoryStore::new())
}
