//! Environment variable input.
//!
//! Variables are read from an explicit [`EnvVars`] snapshot rather than the
//! live process environment, so loading is deterministic and testable.
//!
//! | variable             | type   | default      |
//! |----------------------|--------|--------------|
//! | `NHANH_APP_ID`       | string | none         |
//! | `NHANH_BUSINESS_ID`  | string | none         |
//! | `NHANH_ACCESS_TOKEN` | string | none         |
//! | `NHANH_SECRET_KEY`   | string | none         |
//! | `NHANH_API_VERSION`  | string | `2.0`        |
//! | `NHANH_ENVIRONMENT`  | string | `production` |
//! | `NHANH_TIMEOUT`      | int    | `30`         |
//! | `NHANH_LOG_LEVEL`    | string | `info`       |

use std::collections::HashMap;

use super::{ConfigViolation, RawConfig};
use crate::store::Secret;

pub const APP_ID: &str = "NHANH_APP_ID";
pub const BUSINESS_ID: &str = "NHANH_BUSINESS_ID";
pub const ACCESS_TOKEN: &str = "NHANH_ACCESS_TOKEN";
pub const SECRET_KEY: &str = "NHANH_SECRET_KEY";
pub const API_VERSION: &str = "NHANH_API_VERSION";
pub const ENVIRONMENT: &str = "NHANH_ENVIRONMENT";
pub const TIMEOUT: &str = "NHANH_TIMEOUT";
pub const LOG_LEVEL: &str = "NHANH_LOG_LEVEL";

/// Every variable the SDK reads.
pub const WHITELIST: [&str; 8] = [
    APP_ID,
    BUSINESS_ID,
    ACCESS_TOKEN,
    SECRET_KEY,
    API_VERSION,
    ENVIRONMENT,
    TIMEOUT,
    LOG_LEVEL,
];

/// A snapshot of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the whitelisted variables of the current process.
    ///
    /// Variables that are unset or not valid Unicode are skipped.
    pub fn from_process() -> Self {
        WHITELIST
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (*name, value)))
            .collect()
    }

    /// Add or replace a variable.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Value of `name`, treating empty values as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Convert the whitelisted variables into raw configuration.
    ///
    /// Absent variables stay unset, so merging the result leaves earlier
    /// sources untouched; the documented defaults are applied by
    /// [`validate`](super::validate). A value that fails coercion is recorded
    /// as an input error and reported at validation time.
    pub fn to_raw_config(&self) -> RawConfig {
        let mut raw = RawConfig {
            app_id: self.get(APP_ID).map(str::to_string),
            business_id: self.get(BUSINESS_ID).map(str::to_string),
            access_token: self.get(ACCESS_TOKEN).map(Secret::new),
            secret_key: self.get(SECRET_KEY).map(Secret::new),
            api_version: self.get(API_VERSION).map(str::to_string),
            environment: self.get(ENVIRONMENT).map(str::to_string),
            log_level: self.get(LOG_LEVEL).map(str::to_string),
            ..RawConfig::default()
        };

        raw.timeout = match self.get(TIMEOUT) {
            None => None,
            Some(value) => match value.trim().parse::<i64>() {
                Ok(seconds) => Some(seconds),
                Err(_) => {
                    raw.input_errors.push(ConfigViolation::new(
                        "timeout",
                        format!("{} must be an integer (got '{}')", TIMEOUT, value),
                    ));
                    None
                }
            },
        };

        raw
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
