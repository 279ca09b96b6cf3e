//! Access token records produced by the OAuth exchange.
//!
//! This module provides:
//! - [`TokenRecord`] - A persisted access token with its metadata
//! - [`TokenPolicy`] - The validity window used to compute `expires_at`

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AppId, BusinessId};
use crate::store::Secret;

/// Default validity window applied to freshly exchanged tokens.
///
/// The platform does not return a TTL; this is an assumption, not a value
/// reported by Nhanh.vn. Override it through [`TokenPolicy::with_validity`].
pub const DEFAULT_TOKEN_VALIDITY_DAYS: i64 = 30;

/// Policy used to stamp expiry times onto new token records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    validity: Duration,
}

impl TokenPolicy {
    /// Create a policy with a custom validity window.
    pub fn with_validity(validity: Duration) -> Self {
        Self { validity }
    }

    /// The validity window.
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Compute the expiry for a token created at `created_at`.
    pub fn expires_at(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + self.validity
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self::with_validity(Duration::days(DEFAULT_TOKEN_VALIDITY_DAYS))
    }
}

/// An access token obtained by exchanging an access code.
///
/// Records are never mutated in place; a new exchange produces a new record.
/// The serialized form is the persisted token file layout:
///
/// ```json
/// {"access_token": "...", "created_at": "...", "expires_at": "...",
///  "app_id": "...", "business_id": "..."}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRecord {
    /// The access token value.
    pub access_token: Secret,

    /// When the token was obtained.
    pub created_at: DateTime<Utc>,

    /// Policy-computed expiry (see [`TokenPolicy`]).
    pub expires_at: DateTime<Utc>,

    /// The application the token was issued to.
    pub app_id: AppId,

    /// The business the token grants access to.
    pub business_id: BusinessId,
}

impl TokenRecord {
    /// Create a record stamped with the current time and the given policy.
    pub fn issue(
        access_token: impl Into<String>,
        app_id: AppId,
        business_id: BusinessId,
        policy: &TokenPolicy,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            access_token: Secret::new(access_token),
            created_at,
            expires_at: policy.expires_at(created_at),
            app_id,
            business_id,
        }
    }

    /// Check if this token has passed its policy expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Check if this token will expire within the given duration.
    pub fn expires_within(&self, duration: Duration) -> bool {
        self.expires_at < Utc::now() + duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(policy: &TokenPolicy) -> TokenRecord {
        TokenRecord::issue("tok", AppId::new("A1"), BusinessId::new("B1"), policy)
    }

    #[test]
    fn test_default_policy_is_thirty_days() {
        let token = record(&TokenPolicy::default());
        assert_eq!(token.expires_at - token.created_at, Duration::days(30));
        assert!(!token.is_expired());
    }

    #[test]
    fn test_policy_override() {
        let token = record(&TokenPolicy::with_validity(Duration::minutes(5)));

        assert!(token.expires_within(Duration::minutes(10)));
        assert!(!token.expires_within(Duration::minutes(2)));
    }

    #[test]
    fn test_expired_record() {
        let token = record(&TokenPolicy::with_validity(Duration::hours(-1)));
        assert!(token.is_expired());
    }

    #[test]
    fn test_persisted_layout() {
        let token = record(&TokenPolicy::default());
        let value = serde_json::to_value(&token).unwrap();

        assert_eq!(value["access_token"], "tok");
        assert_eq!(value["app_id"], "A1");
        assert_eq!(value["business_id"], "B1");
        assert!(value["created_at"].is_string());
        assert!(value["expires_at"].is_string());
    }
}
