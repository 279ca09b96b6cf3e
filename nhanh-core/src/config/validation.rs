//! Validation of raw configuration into [`ClientConfig`].

use std::ops::RangeInclusive;
use url::Url;

use super::{
    ClientConfig, ConfigMode, ConfigViolation, DEFAULT_API_DOMAIN, DEFAULT_API_VERSION,
    DEFAULT_ENVIRONMENT, DEFAULT_LOG_ROTATION_DAYS, DEFAULT_RATE_LIMIT, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_TIMEOUT_SECS, LogLevel, LoggingConfig, RawConfig,
};
use crate::model::{AppId, BusinessId};
use crate::store::Secret;

const TIMEOUT_RANGE: RangeInclusive<i64> = 1..=300;
const RETRY_RANGE: RangeInclusive<i64> = 0..=10;
const RATE_LIMIT_RANGE: RangeInclusive<i64> = 1..=1000;
const ROTATION_RANGE: RangeInclusive<i64> = 1..=365;

/// Validate `raw` against the rules of `mode`.
///
/// All violations are collected in a single pass, including input errors
/// recorded by the sources that produced `raw`. Pure function.
pub fn validate(raw: &RawConfig, mode: ConfigMode) -> Result<ClientConfig, Vec<ConfigViolation>> {
    let mut violations = raw.input_errors.clone();

    let app_id = present(raw.app_id.as_deref());
    if app_id.is_none() {
        violations.push(ConfigViolation::new("appId", "App ID is required"));
    }

    let secret_key = trimmed_secret(raw.secret_key.as_ref());
    let return_link = present(raw.return_link.as_deref());
    let business_id = present(raw.business_id.as_deref());
    let access_token = trimmed_secret(raw.access_token.as_ref());

    match mode {
        ConfigMode::OAuth => {
            if secret_key.is_none() {
                violations.push(ConfigViolation::new(
                    "secretKey",
                    "Secret key is required for the OAuth flow",
                ));
            }
            if return_link.is_none() {
                violations.push(ConfigViolation::new(
                    "returnLink",
                    "Return link is required for the OAuth flow",
                ));
            }
        }
        ConfigMode::ApiCall => {
            if business_id.is_none() {
                violations.push(ConfigViolation::new("businessId", "Business ID is required"));
            }
            if access_token.is_none() {
                violations.push(ConfigViolation::new("accessToken", "Access token is required"));
            }
        }
    }

    if let Some(link) = return_link {
        if !is_absolute_http_url(link) {
            violations.push(ConfigViolation::new(
                "returnLink",
                format!("Return link must be an absolute http(s) URL (got '{}')", link),
            ));
        }
    }

    let api_domain = raw
        .api_domain
        .as_deref()
        .map(str::trim)
        .unwrap_or(DEFAULT_API_DOMAIN);
    if !is_absolute_http_url(api_domain) {
        violations.push(ConfigViolation::new(
            "apiDomain",
            format!("API domain must be an absolute http(s) URL (got '{}')", api_domain),
        ));
    }

    let api_version = raw
        .api_version
        .as_deref()
        .map(str::trim)
        .unwrap_or(DEFAULT_API_VERSION);
    if api_version.is_empty() {
        violations.push(ConfigViolation::new("apiVersion", "API version must not be empty"));
    }

    let timeout = in_range(
        &mut violations,
        "timeout",
        "Timeout",
        raw.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
        TIMEOUT_RANGE,
    );
    let retry_attempts = in_range(
        &mut violations,
        "retryAttempts",
        "Retry attempts",
        raw.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
        RETRY_RANGE,
    );
    let rate_limit = in_range(
        &mut violations,
        "rateLimit",
        "Rate limit",
        raw.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT),
        RATE_LIMIT_RANGE,
    );
    let rotation_days = in_range(
        &mut violations,
        "logRotationDays",
        "Log rotation days",
        raw.log_rotation_days.unwrap_or(DEFAULT_LOG_ROTATION_DAYS),
        ROTATION_RANGE,
    );

    let level = match raw.log_level.as_deref() {
        None => LogLevel::Info,
        Some(value) => value.parse::<LogLevel>().unwrap_or_else(|invalid| {
            violations.push(ConfigViolation::new(
                "logLevel",
                format!(
                    "Log level must be one of debug, info, warning, error (got '{}')",
                    invalid
                ),
            ));
            LogLevel::Info
        }),
    };

    if !violations.is_empty() {
        return Err(violations);
    }

    let defaults = LoggingConfig::default();
    Ok(ClientConfig {
        mode,
        app_id: AppId::new(app_id.unwrap_or_default()),
        secret_key,
        return_link: return_link.map(str::to_string),
        business_id: business_id.map(BusinessId::new),
        access_token,
        api_domain: api_domain.trim_end_matches('/').to_string(),
        api_version: api_version.to_string(),
        timeout_secs: timeout as u64,
        retry_attempts: retry_attempts as u32,
        rate_limit: rate_limit as u32,
        logging: LoggingConfig {
            enabled: raw.enable_logging.unwrap_or(defaults.enabled),
            level,
            to_console: raw.log_to_console.unwrap_or(defaults.to_console),
            to_file: raw.log_to_file.unwrap_or(defaults.to_file),
            file: raw.log_file.clone(),
            rotation_days: rotation_days as u32,
        },
        environment: raw
            .environment
            .as_deref()
            .and_then(|e| present(Some(e)))
            .unwrap_or(DEFAULT_ENVIRONMENT)
            .to_string(),
        validate_ssl: raw.validate_ssl.unwrap_or(true),
    })
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn trimmed_secret(value: Option<&Secret>) -> Option<Secret> {
    value
        .filter(|s| !s.is_blank())
        .map(|s| Secret::new(s.expose().trim()))
}

fn in_range(
    violations: &mut Vec<ConfigViolation>,
    field: &'static str,
    label: &str,
    value: i64,
    range: RangeInclusive<i64>,
) -> i64 {
    if !range.contains(&value) {
        violations.push(ConfigViolation::new(
            field,
            format!(
                "{} must be between {} and {} (got {})",
                label,
                range.start(),
                range.end(),
                value
            ),
        ));
    }
    value
}

/// Absolute URL with an http(s) scheme and a host.
pub(crate) fn is_absolute_http_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
