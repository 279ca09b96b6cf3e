//! Identifier types shared across configuration, tokens and storage.
//!
//! - [`AppId`] - Platform-issued identifier of the integrating application
//! - [`BusinessId`] - Identifier of the merchant account being accessed

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the integrating application, issued by Nhanh.vn.
///
/// # Examples
///
/// ```
/// use nhanh_core::AppId;
///
/// let app = AppId::new("74951");
/// assert_eq!(app.as_str(), "74951");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    /// Create a new app ID. Surrounding whitespace is trimmed.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// Get the app ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the ID is empty after trimming.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AppId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AppId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Identifier of the business (merchant account) an access token is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessId(String);

impl BusinessId {
    /// Create a new business ID. Surrounding whitespace is trimmed.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// Get the business ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the ID is empty after trimming.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BusinessId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BusinessId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
