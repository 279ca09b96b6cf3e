//! # Nhanh Core
//!
//! Client SDK for the Nhanh.vn e-commerce platform.
//!
//! This crate provides:
//! - Configuration assembly from setters, config files and environment
//!   variables, validated in one pass ([`ClientBuilder`], [`ClientConfig`])
//! - A first-caller-wins client registry ([`ClientRegistry`])
//! - The OAuth handshake: authorization URL, access code exchange and token
//!   persistence ([`OAuthFlow`], [`Handshake`])
//! - Authenticated, rate-limited API modules ([`Client`], [`ApiModule`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nhanh_core::ClientBuilder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClientBuilder::create()
//!     .app_id("12345")
//!     .business_id("678")
//!     .access_token("token-from-oauth")
//!     .build()?;
//!
//! let products = client
//!     .products()
//!     .call("search", &serde_json::json!({"page": 1}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod oauth;
pub mod rate_limit;
pub mod registry;
pub mod retry;
pub mod store;
pub mod token;
pub mod transport;

pub use client::{ApiModule, Client, Modules};

pub use config::{
    ClientBuilder, ClientConfig, ConfigFileError, ConfigMode, ConfigViolation,
    ConfigurationError, EnvVars, LogLevel, LoggingConfig, RawConfig,
};

pub use error::NhanhError;

pub use logging::{LogSink, Logger, LoggerError};

pub use model::{AppId, BusinessId};

pub use oauth::{
    Callback, CallbackParams, Handshake, HandshakeState, OAuthError, OAuthFlow,
    authorization_url,
};

pub use rate_limit::RateLimiter;

pub use registry::ClientRegistry;

pub use retry::RetryPolicy;

pub use store::{
    FileTokenStore, MemoryStore, Secret, SecretStore, SecretTokenStore, StoreError, TokenStore,
    create_store,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use token::{TokenPolicy, TokenRecord};

pub use transport::{FormRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
