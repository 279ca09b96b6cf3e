use thiserror::Error;

use crate::store::StoreError;
use crate::transport::TransportError;

/// Errors from the OAuth handshake and from authenticated API calls.
///
/// The first five variants mirror the order in which a response is checked,
/// so callers can branch on the kind to decide whether to retry.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// The request failed before an HTTP status was received.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    /// The body was not valid JSON.
    #[error("failed to decode response: {message}")]
    Decode { message: String },

    /// The platform rejected the request (`code != 1`).
    #[error("API error: {}", format_messages(.messages))]
    Api { messages: Vec<String> },

    /// A success response lacked the expected payload.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// The redirect callback could not be interpreted or reported an error.
    #[error("callback error: {message}")]
    Callback { message: String },

    /// The callback arrived after the redirect window closed.
    #[error("authorization redirect expired")]
    RedirectExpired,

    /// A handshake operation was attempted in the wrong state.
    #[error("invalid handshake state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },

    /// A credential needed for the request is not configured.
    #[error("missing credential: {field}")]
    MissingCredentials { field: &'static str },

    /// Persisting or loading the token failed.
    #[error("token storage error: {0}")]
    Store(#[from] StoreError),
}

impl OAuthError {
    /// Whether the failure is transient: transport errors, 429 and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            OAuthError::Transport(_) => true,
            OAuthError::HttpStatus { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Platform messages carried by an [`OAuthError::Api`] error.
    pub fn messages(&self) -> &[String] {
        match self {
            OAuthError::Api { messages } => messages,
            _ => &[],
        }
    }
}

fn format_messages(messages: &[String]) -> String {
    if messages.is_empty() {
        "no message".to_string()
    } else {
        messages.join("; ")
    }
}
