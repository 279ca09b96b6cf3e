//! HTTP transport abstraction.
//!
//! Every call the SDK makes is a form-encoded POST, so the transport surface
//! is a single operation. [`ReqwestTransport`] is the production
//! implementation; tests substitute their own [`HttpTransport`].

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Error raised before an HTTP status was received.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The connection could not be established.
    #[error("connection failed: {message}")]
    Connect { message: String },

    /// The HTTP client could not be constructed.
    #[error("HTTP client initialisation failed: {message}")]
    Init { message: String },

    /// Any other transport-level failure (including reading the body).
    #[error("transport failure: {message}")]
    Other { message: String },
}

/// A form-encoded POST request.
#[derive(Debug, Clone)]
pub struct FormRequest {
    /// Absolute target URL.
    pub url: String,

    /// Form fields in the order they are encoded.
    pub form: Vec<(String, String)>,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Whether TLS certificates are verified.
    pub validate_ssl: bool,
}

impl FormRequest {
    /// Create a request with a 30 second timeout and certificate validation.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            form: Vec::new(),
            timeout: Duration::from_secs(30),
            validate_ssl: true,
        }
    }

    /// Append a form field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Toggle certificate validation.
    pub fn validate_ssl(mut self, validate: bool) -> Self {
        self.validate_ssl = validate;
        self
    }

    /// Value of the first field named `name`.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A raw HTTP response: status and undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends form-encoded POST requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the raw response.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    async fn post_form(&self, request: &FormRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by `reqwest`.
///
/// Holds one client that verifies certificates and one that does not, so the
/// per-request `validate_ssl` flag never rebuilds a connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    verified: reqwest::Client,
    unverified: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the underlying HTTP clients.
    pub fn new() -> Result<Self, TransportError> {
        let user_agent = concat!("nhanh-rs/", env!("CARGO_PKG_VERSION"));

        let build = |accept_invalid: bool| {
            reqwest::Client::builder()
                .user_agent(user_agent)
                .danger_accept_invalid_certs(accept_invalid)
                .build()
                .map_err(|e| TransportError::Init {
                    message: e.to_string(),
                })
        };

        Ok(Self {
            verified: build(false)?,
            unverified: build(true)?,
        })
    }

    fn map_error(error: reqwest::Error, timeout: Duration) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(timeout)
        } else if error.is_connect() {
            TransportError::Connect {
                message: error.to_string(),
            }
        } else {
            TransportError::Other {
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_form(&self, request: &FormRequest) -> Result<HttpResponse, TransportError> {
        let client = if request.validate_ssl {
            &self.verified
        } else {
            &self.unverified
        };

        tracing::debug!(url = %request.url, "POST");

        let response = client
            .post(&request.url)
            .timeout(request.timeout)
            .form(&request.form)
            .send()
            .await
            .map_err(|e| Self::map_error(e, request.timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Self::map_error(e, request.timeout))?;

        Ok(HttpResponse { status, body })
    }
}
