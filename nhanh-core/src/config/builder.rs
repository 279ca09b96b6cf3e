//! Fluent client construction.
//!
//! ```rust,no_run
//! # fn example() -> Result<(), nhanh_core::NhanhError> {
//! use nhanh_core::{ClientBuilder, EnvVars};
//!
//! let client = ClientBuilder::from_environment(&EnvVars::from_process())
//!     .for_development()
//!     .timeout(60)
//!     .build()?;
//! println!("connected as {}", client.app_id());
//! # Ok(())
//! # }
//! ```
//!
//! Sources are applied in call order; a later setter, file or environment
//! snapshot overrides the fields it sets and leaves the rest untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{
    ClientConfig, ConfigFileError, ConfigMode, ConfigurationError, EnvVars, LogLevel, RawConfig,
    file, validate,
};
use crate::client::Client;
use crate::error::NhanhError;
use crate::logging::Logger;
use crate::registry::ClientRegistry;
use crate::store::Secret;
use crate::token::TokenRecord;
use crate::transport::HttpTransport;

/// Accumulates configuration and builds a [`Client`].
///
/// Every setter consumes the builder and returns it; [`build`](Self::build)
/// is the only fallible step.
#[derive(Clone, Default)]
pub struct ClientBuilder {
    raw: RawConfig,
    mode: ConfigMode,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl ClientBuilder {
    /// An empty builder in API-call mode.
    pub fn create() -> Self {
        Self::default()
    }

    /// A builder seeded from a JSON (or `.toml`) config file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        Self::create().config_file(path)
    }

    /// A builder seeded from environment variables.
    pub fn from_environment(env: &EnvVars) -> Self {
        Self::create().environment_vars(env)
    }

    /// An empty builder in OAuth mode.
    pub fn from_oauth() -> Self {
        Self::create().oauth_mode()
    }

    /// Merge the keys of a config file.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        self.raw.merge(file::load(path.as_ref())?);
        Ok(self)
    }

    /// Merge the whitelisted environment variables that are set.
    pub fn environment_vars(mut self, env: &EnvVars) -> Self {
        self.raw.merge(env.to_raw_config());
        self
    }

    /// Validate for the OAuth handshake instead of API calls.
    pub fn oauth_mode(mut self) -> Self {
        self.mode = ConfigMode::OAuth;
        self
    }

    /// Take the app, business and token from a persisted record.
    pub fn with_token_record(self, record: &TokenRecord) -> Self {
        self.app_id(record.app_id.as_str())
            .business_id(record.business_id.as_str())
            .access_token(record.access_token.expose())
    }

    pub fn mode(&self) -> ConfigMode {
        self.mode
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.raw.app_id = Some(app_id.into());
        self
    }

    pub fn secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.raw.secret_key = Some(Secret::new(secret_key));
        self
    }

    pub fn return_link(mut self, return_link: impl Into<String>) -> Self {
        self.raw.return_link = Some(return_link.into());
        self
    }

    /// Alias of [`return_link`](Self::return_link).
    pub fn redirect_url(self, redirect_url: impl Into<String>) -> Self {
        self.return_link(redirect_url)
    }

    pub fn business_id(mut self, business_id: impl Into<String>) -> Self {
        self.raw.business_id = Some(business_id.into());
        self
    }

    pub fn access_token(mut self, access_token: impl Into<String>) -> Self {
        self.raw.access_token = Some(Secret::new(access_token));
        self
    }

    pub fn api_domain(mut self, api_domain: impl Into<String>) -> Self {
        self.raw.api_domain = Some(api_domain.into());
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.raw.api_version = Some(api_version.into());
        self
    }

    /// Request timeout in seconds (1 to 300).
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.raw.timeout = Some(i64::try_from(seconds).unwrap_or(i64::MAX));
        self
    }

    /// Retries after a transient failure (0 to 10).
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.raw.retry_attempts = Some(attempts.into());
        self
    }

    /// Requests per 30 second window (1 to 1000).
    pub fn rate_limit(mut self, requests: u32) -> Self {
        self.raw.rate_limit = Some(requests.into());
        self
    }

    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.raw.enable_logging = Some(enabled);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.raw.log_level = Some(level.as_str().to_string());
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.log_file = Some(path.into());
        self
    }

    pub fn log_to_console(mut self, enabled: bool) -> Self {
        self.raw.log_to_console = Some(enabled);
        self
    }

    pub fn log_to_file(mut self, enabled: bool) -> Self {
        self.raw.log_to_file = Some(enabled);
        self
    }

    pub fn log_rotation_days(mut self, days: u32) -> Self {
        self.raw.log_rotation_days = Some(days.into());
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.raw.environment = Some(environment.into());
        self
    }

    pub fn validate_ssl(mut self, validate: bool) -> Self {
        self.raw.validate_ssl = Some(validate);
        self
    }

    /// Use `transport` instead of the default `reqwest` one.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Development preset: debug logging to the console, no SSL validation.
    pub fn for_development(self) -> Self {
        self.preset("development", true, LogLevel::Debug, false, true, false)
    }

    /// Production preset: warnings to rolling log files, SSL validated.
    pub fn for_production(self) -> Self {
        self.preset("production", true, LogLevel::Warning, true, false, true)
    }

    /// Testing preset: logging off, no SSL validation.
    pub fn for_testing(self) -> Self {
        self.preset("testing", false, LogLevel::Error, false, false, false)
    }

    fn preset(
        self,
        environment: &str,
        logging: bool,
        level: LogLevel,
        validate_ssl: bool,
        console: bool,
        file: bool,
    ) -> Self {
        self.environment(environment)
            .enable_logging(logging)
            .log_level(level)
            .validate_ssl(validate_ssl)
            .log_to_console(console)
            .log_to_file(file)
    }

    /// Validate without building a client.
    pub fn validate(&self) -> Result<ClientConfig, ConfigurationError> {
        validate(&self.raw, self.mode).map_err(|violations| ConfigurationError { violations })
    }

    /// Validate and return the process-wide client.
    ///
    /// The first successful build in the process creates the client; later
    /// builds return that same client regardless of their configuration.
    pub fn build(self) -> Result<Arc<Client>, NhanhError> {
        self.build_with(ClientRegistry::global())
    }

    /// Validate and return the client held by `registry`.
    pub fn build_with(self, registry: &ClientRegistry) -> Result<Arc<Client>, NhanhError> {
        let config = self.validate()?;
        let transport = self.transport;

        registry.get_or_create_with(config, move |config| {
            let client = match transport {
                Some(transport) => Client::with_transport(config, transport),
                None => Client::new(config)?,
            };

            let logging = client.config().logging();
            if logging.enabled {
                client.set_logger(Logger::from_config(logging));
            }
            Ok(client)
        })
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("raw", &self.raw)
            .field("mode", &self.mode)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env;
    use crate::model::{AppId, BusinessId};
    use crate::token::TokenPolicy;

    fn api_builder() -> ClientBuilder {
        ClientBuilder::create()
            .app_id("A1")
            .business_id("B1")
            .access_token("TOK")
    }

    #[test]
    fn test_presets_are_fixed_bundles() {
        let dev = api_builder().for_production().for_development().validate().unwrap();
        assert_eq!(dev.environment(), "development");
        assert!(dev.logging().enabled);
        assert_eq!(dev.logging().level, LogLevel::Debug);
        assert!(!dev.validate_ssl());
        assert!(dev.logging().to_console);
        assert!(!dev.logging().to_file);

        let prod = api_builder().for_production().validate().unwrap();
        assert_eq!(prod.environment(), "production");
        assert_eq!(prod.logging().level, LogLevel::Warning);
        assert!(prod.validate_ssl());
        assert!(!prod.logging().to_console);
        assert!(prod.logging().to_file);

        let test = api_builder().for_testing().validate().unwrap();
        assert_eq!(test.environment(), "testing");
        assert!(!test.logging().enabled);
        assert_eq!(test.logging().level, LogLevel::Error);
    }

    #[test]
    fn test_later_setters_override() {
        let config = api_builder()
            .for_development()
            .validate_ssl(true)
            .timeout(90)
            .validate()
            .unwrap();
        assert!(config.validate_ssl());
        assert_eq!(config.timeout().as_secs(), 90);
    }

    #[test]
    fn test_oauth_mode_relaxes_api_fields() {
        let builder = ClientBuilder::from_oauth()
            .app_id("A1")
            .secret_key("S")
            .redirect_url("https://x.test/cb");

        assert_eq!(builder.mode(), ConfigMode::OAuth);
        let config = builder.validate().unwrap();
        assert!(!config.has_api_credentials());
        assert_eq!(config.return_link(), Some("https://x.test/cb"));
    }

    #[test]
    fn test_validation_reports_all_violations() {
        let error = ClientBuilder::create()
            .timeout(0)
            .rate_limit(5000)
            .validate()
            .unwrap_err();

        for field in ["appId", "businessId", "accessToken", "timeout", "rateLimit"] {
            assert!(error.has_field(field), "missing {}", field);
        }
        assert_eq!(error.to_string().lines().count(), 5);
    }

    #[test]
    fn test_environment_then_setters() {
        let env = EnvVars::new()
            .set(env::APP_ID, "A1")
            .set(env::BUSINESS_ID, "B1")
            .set(env::ACCESS_TOKEN, "TOK")
            .set(env::TIMEOUT, "45");

        let config = ClientBuilder::from_environment(&env)
            .business_id("B2")
            .validate()
            .unwrap();
        assert_eq!(config.app_id().as_str(), "A1");
        assert_eq!(config.business_id().unwrap().as_str(), "B2");
        assert_eq!(config.timeout().as_secs(), 45);
    }

    #[test]
    fn test_preset_survives_sparse_environment() {
        let config = api_builder()
            .for_development()
            .environment_vars(&EnvVars::new())
            .validate()
            .unwrap();
        assert_eq!(config.environment(), "development");
        assert_eq!(config.logging().level, LogLevel::Debug);

        let env = EnvVars::new().set(env::LOG_LEVEL, "error");
        let config = api_builder()
            .for_production()
            .environment_vars(&env)
            .validate()
            .unwrap();
        assert_eq!(config.environment(), "production");
        assert_eq!(config.logging().level, LogLevel::Error);
        assert!(config.logging().to_file);
    }

    #[test]
    fn test_with_token_record() {
        let record = TokenRecord::issue(
            "T",
            AppId::new("A9"),
            BusinessId::new("B9"),
            &TokenPolicy::default(),
        );
        let config = ClientBuilder::create()
            .with_token_record(&record)
            .validate()
            .unwrap();

        assert_eq!(config.app_id().as_str(), "A9");
        assert_eq!(config.access_token().unwrap().expose(), "T");
    }

    #[test]
    fn test_build_with_registry_attaches_logger() {
        let registry = ClientRegistry::new();
        let client = api_builder()
            .enable_logging(true)
            .log_to_console(true)
            .build_with(&registry)
            .unwrap();

        assert!(!client.logger().is_noop());
        assert!(!client.products().logger().is_noop());
    }

    #[test]
    fn test_invalid_build_is_a_config_error() {
        let registry = ClientRegistry::new();
        let error = ClientBuilder::create().build_with(&registry).unwrap_err();

        assert!(error.as_configuration().unwrap().has_field("appId"));
        assert!(registry.current().is_none());
    }
}
