//! State machine for one authorization attempt.
//!
//! ```text
//! NotStarted -> AwaitingRedirect -> CallbackReceived(code | error)
//!            -> Exchanging -> TokenObtained | ExchangeFailed
//! ```
//!
//! `AwaitingRedirect` closes after a configurable window (10 minutes by
//! default); a callback arriving later is rejected with
//! [`OAuthError::RedirectExpired`].

use std::time::Duration;
use tokio::time::Instant;
use url::{Url, form_urlencoded};

use super::{OAuthError, OAuthFlow};
use crate::model::AppId;

/// Default lifetime of the `AwaitingRedirect` state.
pub const DEFAULT_REDIRECT_TTL: Duration = Duration::from_secs(10 * 60);

/// Query parameters delivered to the return link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub access_code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse a query string (with or without the leading `?`).
    ///
    /// `accessCode` is also accepted as `access_code` or `code`.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "accessCode" | "access_code" | "code" => {
                    params.access_code.get_or_insert(value);
                }
                "error" => params.error = Some(value),
                "error_description" | "errorDescription" => {
                    params.error_description = Some(value)
                }
                _ => {}
            }
        }

        params
    }

    /// Parse the query of a full callback URL.
    pub fn from_url(url: &str) -> Result<Self, OAuthError> {
        let parsed = Url::parse(url).map_err(|e| OAuthError::Callback {
            message: format!("invalid callback URL: {}", e),
        })?;
        Ok(Self::from_query(parsed.query().unwrap_or_default()))
    }
}

/// Outcome carried by the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Code(String),
    Error(String),
}

/// Current state of a [`Handshake`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    NotStarted,
    AwaitingRedirect { since: Instant },
    CallbackReceived(Callback),
    Exchanging,
    TokenObtained,
    ExchangeFailed { message: String },
}

impl HandshakeState {
    pub fn name(&self) -> &'static str {
        match self {
            HandshakeState::NotStarted => "not_started",
            HandshakeState::AwaitingRedirect { .. } => "awaiting_redirect",
            HandshakeState::CallbackReceived(_) => "callback_received",
            HandshakeState::Exchanging => "exchanging",
            HandshakeState::TokenObtained => "token_obtained",
            HandshakeState::ExchangeFailed { .. } => "exchange_failed",
        }
    }
}

/// One authorization attempt for an application.
#[derive(Debug, Clone)]
pub struct Handshake {
    app_id: AppId,
    api_version: String,
    return_link: String,
    redirect_ttl: Duration,
    state: HandshakeState,
}

impl Handshake {
    pub fn new(app_id: AppId, api_version: impl Into<String>, return_link: impl Into<String>) -> Self {
        Self {
            app_id,
            api_version: api_version.into(),
            return_link: return_link.into(),
            redirect_ttl: DEFAULT_REDIRECT_TTL,
            state: HandshakeState::NotStarted,
        }
    }

    /// Override how long the redirect is awaited.
    pub fn with_redirect_ttl(mut self, ttl: Duration) -> Self {
        self.redirect_ttl = ttl;
        self
    }

    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn return_link(&self) -> &str {
        &self.return_link
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    /// Whether the redirect window has closed.
    pub fn is_expired(&self) -> bool {
        match self.state {
            HandshakeState::AwaitingRedirect { since } => since.elapsed() > self.redirect_ttl,
            _ => false,
        }
    }

    /// Build the authorization URL and start waiting for the redirect.
    ///
    /// Any state except `Exchanging` may be restarted.
    pub fn start(&mut self, flow: &OAuthFlow) -> Result<String, OAuthError> {
        if self.state == HandshakeState::Exchanging {
            return Err(self.invalid_state("a state other than exchanging"));
        }

        let url = flow.build_authorization_url(&self.app_id, &self.api_version, &self.return_link);
        self.state = HandshakeState::AwaitingRedirect {
            since: Instant::now(),
        };
        tracing::debug!(app_id = %self.app_id, "awaiting authorization redirect");
        Ok(url)
    }

    /// Record the redirect outcome.
    ///
    /// An error reported by the platform is recorded as
    /// `CallbackReceived(Callback::Error)`, not returned; parameters carrying
    /// neither a code nor an error are rejected and leave the state unchanged.
    pub fn receive_callback(&mut self, params: &CallbackParams) -> Result<(), OAuthError> {
        if !matches!(self.state, HandshakeState::AwaitingRedirect { .. }) {
            return Err(self.invalid_state("awaiting_redirect"));
        }
        if self.is_expired() {
            self.state = HandshakeState::NotStarted;
            return Err(OAuthError::RedirectExpired);
        }

        let callback = match (&params.error, &params.access_code) {
            (Some(error), _) => Callback::Error(
                params
                    .error_description
                    .as_ref()
                    .map(|desc| format!("{}: {}", error, desc))
                    .unwrap_or_else(|| error.clone()),
            ),
            (None, Some(code)) => Callback::Code(code.clone()),
            (None, None) => {
                return Err(OAuthError::Callback {
                    message: "callback carries neither an access code nor an error".to_string(),
                });
            }
        };

        self.state = HandshakeState::CallbackReceived(callback);
        Ok(())
    }

    /// Move to `Exchanging` and hand out the access code.
    pub(crate) fn begin_exchange(&mut self) -> Result<String, OAuthError> {
        match &self.state {
            HandshakeState::CallbackReceived(Callback::Code(code)) => {
                let code = code.clone();
                self.state = HandshakeState::Exchanging;
                Ok(code)
            }
            HandshakeState::CallbackReceived(Callback::Error(message)) => {
                let message = message.clone();
                self.state = HandshakeState::ExchangeFailed {
                    message: message.clone(),
                };
                Err(OAuthError::Callback { message })
            }
            _ => Err(self.invalid_state("callback_received")),
        }
    }

    pub(crate) fn finish_exchange(&mut self, outcome: Result<(), String>) {
        self.state = match outcome {
            Ok(()) => HandshakeState::TokenObtained,
            Err(message) => HandshakeState::ExchangeFailed { message },
        };
    }

    fn invalid_state(&self, expected: &'static str) -> OAuthError {
        OAuthError::InvalidState {
            expected,
            actual: self.state.name().to_string(),
        }
    }
}
