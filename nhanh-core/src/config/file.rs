//! Config file loading.
//!
//! The canonical schema uses camelCase keys. Older files mixed in snake_case
//! names; these are accepted as aliases:
//!
//! | legacy key       | canonical key   |
//! |------------------|-----------------|
//! | `redirectUrl`    | `returnLink`    |
//! | `retry_attempts` | `retryAttempts` |
//! | `rate_limit`     | `rateLimit`     |
//! | `enable_logging` | `enableLogging` |
//! | `log_level`      | `logLevel`      |
//!
//! Unknown keys are ignored. Files ending in `.toml` are parsed as TOML, all
//! others as JSON.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::RawConfig;
use crate::store::Secret;

/// Error reading or decoding a config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file does not exist.
    #[error("config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid config document.
    #[error("failed to decode config file {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },
}

/// On-disk schema.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    app_id: Option<String>,
    secret_key: Option<String>,
    #[serde(alias = "redirectUrl")]
    return_link: Option<String>,
    business_id: Option<String>,
    access_token: Option<String>,
    api_version: Option<String>,
    api_domain: Option<String>,
    timeout: Option<i64>,
    #[serde(alias = "retry_attempts")]
    retry_attempts: Option<i64>,
    #[serde(alias = "rate_limit")]
    rate_limit: Option<i64>,
    #[serde(alias = "enable_logging")]
    enable_logging: Option<bool>,
    #[serde(alias = "log_level")]
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    log_to_console: Option<bool>,
    log_to_file: Option<bool>,
    log_rotation_days: Option<i64>,
    #[serde(rename = "validateSSL")]
    validate_ssl: Option<bool>,
    environment: Option<String>,
}

impl From<ConfigFile> for RawConfig {
    fn from(file: ConfigFile) -> Self {
        RawConfig {
            app_id: file.app_id,
            secret_key: file.secret_key.map(Secret::new),
            return_link: file.return_link,
            business_id: file.business_id,
            access_token: file.access_token.map(Secret::new),
            api_domain: file.api_domain,
            api_version: file.api_version,
            timeout: file.timeout,
            retry_attempts: file.retry_attempts,
            rate_limit: file.rate_limit,
            enable_logging: file.enable_logging,
            log_level: file.log_level,
            log_file: file.log_file,
            log_to_console: file.log_to_console,
            log_to_file: file.log_to_file,
            log_rotation_days: file.log_rotation_days,
            environment: file.environment,
            validate_ssl: file.validate_ssl,
            input_errors: Vec::new(),
        }
    }
}

/// Read and decode a config file into raw configuration.
pub fn load(path: &Path) -> Result<RawConfig, ConfigFileError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigFileError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigFileError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let parsed: ConfigFile = if is_toml {
        toml::from_str(&contents).map_err(|e| decode_error(path, e))?
    } else {
        serde_json::from_str(&contents).map_err(|e| decode_error(path, e))?
    };

    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(parsed.into())
}

fn decode_error(path: &Path, error: impl std::fmt::Display) -> ConfigFileError {
    ConfigFileError::Decode {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_canonical_json_keys() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "nhanh.json",
            r#"{
                "appId": "A1",
                "secretKey": "S",
                "returnLink": "https://x.test/cb",
                "retryAttempts": 2,
                "rateLimit": 100,
                "validateSSL": false,
                "logRotationDays": 14
            }"#,
        );

        let raw = load(&path).unwrap();
        assert_eq!(raw.app_id.as_deref(), Some("A1"));
        assert_eq!(raw.secret_key.unwrap().expose(), "S");
        assert_eq!(raw.return_link.as_deref(), Some("https://x.test/cb"));
        assert_eq!(raw.retry_attempts, Some(2));
        assert_eq!(raw.rate_limit, Some(100));
        assert_eq!(raw.validate_ssl, Some(false));
        assert_eq!(raw.log_rotation_days, Some(14));
    }

    #[test]
    fn test_legacy_keys_are_mapped() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "legacy.json",
            r#"{
                "appId": "A1",
                "redirectUrl": "https://x.test/cb",
                "retry_attempts": 5,
                "rate_limit": 50,
                "enable_logging": true,
                "log_level": "debug",
                "logFile": "/tmp/nhanh.log",
                "somethingElse": [1, 2, 3]
            }"#,
        );

        let raw = load(&path).unwrap();
        assert_eq!(raw.return_link.as_deref(), Some("https://x.test/cb"));
        assert_eq!(raw.retry_attempts, Some(5));
        assert_eq!(raw.rate_limit, Some(50));
        assert_eq!(raw.enable_logging, Some(true));
        assert_eq!(raw.log_level.as_deref(), Some("debug"));
        assert_eq!(raw.log_file, Some(PathBuf::from("/tmp/nhanh.log")));
    }

    #[test]
    fn test_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "nhanh.toml",
            "appId = \"A1\"\nbusinessId = \"B1\"\ntimeout = 45\n",
        );

        let raw = load(&path).unwrap();
        assert_eq!(raw.business_id.as_deref(), Some("B1"));
        assert_eq!(raw.timeout, Some(45));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigFileError::NotFound { .. })));
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.json", "{ \"appId\": ");
        assert!(matches!(load(&path), Err(ConfigFileError::Decode { .. })));

        let wrong_type = write(&dir, "typed.json", r#"{ "timeout": "thirty" }"#);
        assert!(matches!(load(&wrong_type), Err(ConfigFileError::Decode { .. })));
    }
}
