//! Client configuration.
//!
//! Configuration is gathered into a [`RawConfig`] by the
//! [`ClientBuilder`] from explicit setters, a config file ([`file`]) and
//! environment variables ([`env`]). [`validate`] turns it into an immutable
//! [`ClientConfig`] or reports every violation at once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::model::{AppId, BusinessId};
use crate::store::Secret;

pub mod builder;
pub mod env;
pub mod file;
mod validation;

pub use builder::ClientBuilder;
pub use env::EnvVars;
pub use file::ConfigFileError;
pub use validation::validate;

/// Default API host.
pub const DEFAULT_API_DOMAIN: &str = "https://open.nhanh.vn";
/// Default API version sent with every request.
pub const DEFAULT_API_VERSION: &str = "2.0";
/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: i64 = 30;
/// Default number of retries after a transient failure.
pub const DEFAULT_RETRY_ATTEMPTS: i64 = 3;
/// Default requests allowed per 30 second window.
pub const DEFAULT_RATE_LIMIT: i64 = 150;
/// Default number of daily log files kept.
pub const DEFAULT_LOG_ROTATION_DAYS: i64 = 7;
/// Default environment name.
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Which required-field set a configuration must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMode {
    /// Authenticated API calls: needs `businessId` and `accessToken`.
    #[default]
    ApiCall,

    /// OAuth handshake: needs `secretKey` and `returnLink`.
    #[serde(rename = "oauth")]
    OAuth,
}

impl fmt::Display for ConfigMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigMode::ApiCall => write!(f, "api_call"),
            ConfigMode::OAuth => write!(f, "oauth"),
        }
    }
}

/// Log threshold accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// All accepted values, lowest threshold first.
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
    ];

    /// The configuration spelling of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }

    /// The equivalent `tracing` filter.
    pub fn as_level_filter(&self) -> tracing_subscriber::filter::LevelFilter {
        use tracing_subscriber::filter::LevelFilter;
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    /// Case-insensitive parse of `debug`, `info`, `warning` or `error`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| s.to_string())
    }
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigViolation {
    /// Canonical (camelCase) name of the offending field.
    pub field: &'static str,

    /// Human-readable description.
    pub message: String,
}

impl ConfigViolation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Every violation found while validating a configuration.
///
/// The message is the newline-joined list of violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_violations(.violations))]
pub struct ConfigurationError {
    pub violations: Vec<ConfigViolation>,
}

fn join_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

impl ConfigurationError {
    /// Whether any violation concerns `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

/// Unvalidated configuration fragments.
///
/// Every field is optional; numeric fields are kept signed so out-of-range
/// input can be reported instead of rejected at parse time.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub app_id: Option<String>,
    pub secret_key: Option<Secret>,
    pub return_link: Option<String>,
    pub business_id: Option<String>,
    pub access_token: Option<Secret>,
    pub api_domain: Option<String>,
    pub api_version: Option<String>,
    pub timeout: Option<i64>,
    pub retry_attempts: Option<i64>,
    pub rate_limit: Option<i64>,
    pub enable_logging: Option<bool>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub log_to_console: Option<bool>,
    pub log_to_file: Option<bool>,
    pub log_rotation_days: Option<i64>,
    pub environment: Option<String>,
    pub validate_ssl: Option<bool>,

    /// Input problems found while reading a source (e.g. a non-numeric
    /// environment value), reported together with the validation result.
    pub input_errors: Vec<ConfigViolation>,
}

impl RawConfig {
    /// Overlay `other` on top of `self`: fields set in `other` win.
    pub fn merge(&mut self, other: RawConfig) {
        overlay(&mut self.app_id, other.app_id);
        overlay(&mut self.secret_key, other.secret_key);
        overlay(&mut self.return_link, other.return_link);
        overlay(&mut self.business_id, other.business_id);
        overlay(&mut self.access_token, other.access_token);
        overlay(&mut self.api_domain, other.api_domain);
        overlay(&mut self.api_version, other.api_version);
        overlay(&mut self.timeout, other.timeout);
        overlay(&mut self.retry_attempts, other.retry_attempts);
        overlay(&mut self.rate_limit, other.rate_limit);
        overlay(&mut self.enable_logging, other.enable_logging);
        overlay(&mut self.log_level, other.log_level);
        overlay(&mut self.log_file, other.log_file);
        overlay(&mut self.log_to_console, other.log_to_console);
        overlay(&mut self.log_to_file, other.log_to_file);
        overlay(&mut self.log_rotation_days, other.log_rotation_days);
        overlay(&mut self.environment, other.environment);
        overlay(&mut self.validate_ssl, other.validate_ssl);
        self.input_errors.extend(other.input_errors);
    }
}

fn overlay<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

/// Logging settings of a validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: LogLevel,
    pub to_console: bool,
    pub to_file: bool,
    /// Log file path; the file name is used as the rolling-file prefix.
    pub file: Option<PathBuf>,
    /// Number of daily files kept.
    pub rotation_days: u32,
}

impl LoggingConfig {
    /// Configured log file, or `logs/nhanh.log`.
    pub fn file_path(&self) -> &Path {
        self.file
            .as_deref()
            .unwrap_or_else(|| Path::new("logs/nhanh.log"))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: LogLevel::Info,
            to_console: true,
            to_file: false,
            file: None,
            rotation_days: DEFAULT_LOG_ROTATION_DAYS as u32,
        }
    }
}

/// Immutable, validated client configuration.
///
/// Only [`validate`] constructs it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub(crate) mode: ConfigMode,
    pub(crate) app_id: AppId,
    pub(crate) secret_key: Option<Secret>,
    pub(crate) return_link: Option<String>,
    pub(crate) business_id: Option<BusinessId>,
    pub(crate) access_token: Option<Secret>,
    pub(crate) api_domain: String,
    pub(crate) api_version: String,
    pub(crate) timeout_secs: u64,
    pub(crate) retry_attempts: u32,
    pub(crate) rate_limit: u32,
    pub(crate) logging: LoggingConfig,
    pub(crate) environment: String,
    pub(crate) validate_ssl: bool,
}

impl ClientConfig {
    pub fn mode(&self) -> ConfigMode {
        self.mode
    }

    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    pub fn secret_key(&self) -> Option<&Secret> {
        self.secret_key.as_ref()
    }

    pub fn return_link(&self) -> Option<&str> {
        self.return_link.as_deref()
    }

    pub fn business_id(&self) -> Option<&BusinessId> {
        self.business_id.as_ref()
    }

    pub fn access_token(&self) -> Option<&Secret> {
        self.access_token.as_ref()
    }

    /// API host without a trailing slash.
    pub fn api_domain(&self) -> &str {
        &self.api_domain
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Requests allowed per 30 second window.
    pub fn rate_limit(&self) -> u32 {
        self.rate_limit
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn validate_ssl(&self) -> bool {
        self.validate_ssl
    }

    /// Whether API-call credentials are present.
    pub fn has_api_credentials(&self) -> bool {
        self.business_id.is_some() && self.access_token.is_some()
    }
}
