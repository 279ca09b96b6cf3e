//! Top-level error type for the SDK.

use thiserror::Error;

use crate::config::{ConfigFileError, ConfigurationError};
use crate::oauth::OAuthError;
use crate::store::StoreError;
use crate::transport::TransportError;

/// Error type encompassing every failure the SDK surfaces.
#[derive(Debug, Error)]
pub enum NhanhError {
    /// The assembled configuration is invalid.
    #[error("configuration error:\n{0}")]
    Config(#[from] ConfigurationError),

    /// A config file could not be read.
    #[error(transparent)]
    ConfigFile(#[from] ConfigFileError),

    /// OAuth handshake or API call failure.
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// Token or secret storage failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The HTTP client could not be set up.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl NhanhError {
    /// The configuration violations, if this is a configuration error.
    pub fn as_configuration(&self) -> Option<&ConfigurationError> {
        match self {
            NhanhError::Config(e) => Some(e),
            _ => None,
        }
    }
}
