//! Nhanh.vn OAuth handshake.
//!
//! The platform's flow is close to, but not quite, OAuth 2.0:
//!
//! 1. Send the user to `https://nhanh.vn/oauth?version&appId&returnLink`
//! 2. The user grants access; the platform redirects to `returnLink` with an
//!    `accessCode` query parameter
//! 3. POST the code to `{apiDomain}/api/oauth/access_token`
//! 4. Persist the returned access token for later API calls
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use nhanh_core::{AppId, BusinessId, FileTokenStore, OAuthFlow, ReqwestTransport};
//!
//! let flow = OAuthFlow::new(
//!     Arc::new(ReqwestTransport::new()?),
//!     Arc::new(FileTokenStore::at_default_path()?),
//! );
//!
//! let app_id = AppId::new("12345");
//! println!("Visit: {}", flow.build_authorization_url(&app_id, "2.0", "https://shop.test/cb"));
//!
//! // After the redirect delivers the access code...
//! let record = flow
//!     .exchange_access_code("code-from-redirect", &app_id, &BusinessId::new("678"), "2.0")
//!     .await?;
//! flow.persist_token(&record).await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod handshake;
pub mod response;

pub use error::OAuthError;
pub use handshake::{Callback, CallbackParams, Handshake, HandshakeState};

use std::sync::Arc;
use std::time::Duration;
use url::form_urlencoded;

use crate::config::{ClientConfig, DEFAULT_API_DOMAIN};
use crate::model::{AppId, BusinessId};
use crate::retry::RetryPolicy;
use crate::store::TokenStore;
use crate::token::{TokenPolicy, TokenRecord};
use crate::transport::{FormRequest, HttpTransport};

/// Authorization endpoint users are sent to.
pub const AUTHORIZE_URL: &str = "https://nhanh.vn/oauth";

/// Path of the code exchange endpoint, relative to the API domain.
pub const TOKEN_PATH: &str = "/api/oauth/access_token";

/// Build the authorization URL for `base`.
///
/// Query keys are always emitted in the order `version`, `appId`,
/// `returnLink`, form-encoded, so equal inputs give byte-identical output.
pub fn authorization_url(base: &str, app_id: &AppId, api_version: &str, return_link: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("version", api_version)
        .append_pair("appId", app_id.as_str())
        .append_pair("returnLink", return_link)
        .finish();
    format!("{}?{}", base, query)
}

/// Drives the authorization URL, code exchange and token persistence.
pub struct OAuthFlow {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn TokenStore>,
    authorize_url: String,
    api_domain: String,
    timeout: Duration,
    validate_ssl: bool,
    retry: RetryPolicy,
    policy: TokenPolicy,
}

impl OAuthFlow {
    /// Create a flow against the production endpoints with default settings.
    pub fn new(transport: Arc<dyn HttpTransport>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            transport,
            store,
            authorize_url: AUTHORIZE_URL.to_string(),
            api_domain: DEFAULT_API_DOMAIN.to_string(),
            timeout: Duration::from_secs(30),
            validate_ssl: true,
            retry: RetryPolicy::default(),
            policy: TokenPolicy::default(),
        }
    }

    /// Create a flow using the domain, timeout, SSL and retry settings of
    /// `config`.
    pub fn from_config(
        config: &ClientConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self::new(transport, store)
            .with_api_domain(config.api_domain())
            .with_timeout(config.timeout())
            .with_validate_ssl(config.validate_ssl())
            .with_retry(RetryPolicy::with_retries(config.retry_attempts()))
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    /// Set the API domain; a trailing slash is ignored.
    pub fn with_api_domain(mut self, domain: impl Into<String>) -> Self {
        self.api_domain = domain.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_validate_ssl(mut self, validate: bool) -> Self {
        self.validate_ssl = validate;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the validity window stamped on new tokens.
    pub fn with_token_policy(mut self, policy: TokenPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Full URL of the code exchange endpoint.
    pub fn token_endpoint(&self) -> String {
        format!("{}{}", self.api_domain, TOKEN_PATH)
    }

    pub fn token_policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Build the URL the user visits to grant access. Pure.
    pub fn build_authorization_url(
        &self,
        app_id: &AppId,
        api_version: &str,
        return_link: &str,
    ) -> String {
        authorization_url(&self.authorize_url, app_id, api_version, return_link)
    }

    /// Exchange a one-time access code for an access token.
    ///
    /// Transient failures (transport errors, 429, 5xx) are retried according
    /// to the flow's [`RetryPolicy`]; every other error is returned as is.
    ///
    /// # Errors
    ///
    /// See [`OAuthError`] for the response disambiguation order.
    pub async fn exchange_access_code(
        &self,
        access_code: &str,
        app_id: &AppId,
        business_id: &BusinessId,
        api_version: &str,
    ) -> Result<TokenRecord, OAuthError> {
        let access_code = access_code.trim();
        if access_code.is_empty() {
            return Err(OAuthError::MissingCredentials { field: "accessCode" });
        }

        let request = FormRequest::new(self.token_endpoint())
            .field("version", api_version)
            .field("appId", app_id.as_str())
            .field("businessId", business_id.as_str())
            .field("accessCode", access_code)
            .timeout(self.timeout)
            .validate_ssl(self.validate_ssl);

        tracing::info!(app_id = %app_id, business_id = %business_id, "exchanging access code");

        let transport = &self.transport;
        let request = &request;
        let token = self
            .retry
            .run(move || async move {
                let reply = transport.post_form(request).await?;
                response::decode_token_response(&reply)
            })
            .await
            .inspect_err(|e| tracing::warn!(app_id = %app_id, "access code exchange failed: {}", e))?;

        tracing::info!(app_id = %app_id, "access token obtained");
        Ok(TokenRecord::issue(
            token,
            app_id.clone(),
            business_id.clone(),
            &self.policy,
        ))
    }

    /// Save `record` to the token store.
    pub async fn persist_token(&self, record: &TokenRecord) -> Result<(), OAuthError> {
        self.store.save(record).await?;
        tracing::debug!(app_id = %record.app_id, "persisted access token");
        Ok(())
    }

    /// Load the persisted token, if any.
    pub async fn load_token(&self) -> Result<Option<TokenRecord>, OAuthError> {
        Ok(self.store.load().await?)
    }

    /// Exchange and persist the code carried by `handshake`'s callback.
    ///
    /// The handshake must be in [`HandshakeState::CallbackReceived`]; it ends
    /// in `TokenObtained` or `ExchangeFailed`.
    pub async fn complete_handshake(
        &self,
        handshake: &mut Handshake,
        business_id: &BusinessId,
    ) -> Result<TokenRecord, OAuthError> {
        let code = handshake.begin_exchange()?;

        let result = match self
            .exchange_access_code(&code, handshake.app_id(), business_id, handshake.api_version())
            .await
        {
            Ok(record) => self.persist_token(&record).await.map(|()| record),
            Err(e) => Err(e),
        };

        handshake.finish_exchange(result.as_ref().map(|_| ()).map_err(|e| e.to_string()));
        result
    }
}

impl std::fmt::Debug for OAuthFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthFlow")
            .field("authorize_url", &self.authorize_url)
            .field("api_domain", &self.api_domain)
            .field("timeout", &self.timeout)
            .field("validate_ssl", &self.validate_ssl)
            .field("retry", &self.retry)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileTokenStore, MemoryStore, SecretTokenStore};
    use crate::transport::{HttpResponse, TransportError};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Replays canned responses and records every request.
    struct StubTransport {
        responses: Mutex<Vec<Result<HttpResponse, TransportError>>>,
        requests: Mutex<Vec<FormRequest>>,
    }

    impl StubTransport {
        fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn body(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for StubTransport {
        async fn post_form(&self, request: &FormRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().push(request.clone());
            self.responses.lock().pop().unwrap_or_else(|| {
                Err(TransportError::Other {
                    message: "no more responses".to_string(),
                })
            })
        }
    }

    fn flow(transport: Arc<StubTransport>) -> OAuthFlow {
        let store = SecretTokenStore::new(MemoryStore::new(), &AppId::new("A1"));
        OAuthFlow::new(transport, Arc::new(store)).with_retry(RetryPolicy::none())
    }

    async fn exchange(flow: &OAuthFlow) -> Result<TokenRecord, OAuthError> {
        flow.exchange_access_code("CODE", &AppId::new("A1"), &BusinessId::new("B1"), "2.0")
            .await
    }

    #[test]
    fn test_authorization_url_is_deterministic() {
        let app_id = AppId::new("A1");
        let first = authorization_url(AUTHORIZE_URL, &app_id, "2.0", "https://x.test/cb?a=1&b=2");
        let second = authorization_url(AUTHORIZE_URL, &app_id, "2.0", "https://x.test/cb?a=1&b=2");

        assert_eq!(first, second);
        assert_eq!(
            first,
            "https://nhanh.vn/oauth?version=2.0&appId=A1&returnLink=https%3A%2F%2Fx.test%2Fcb%3Fa%3D1%26b%3D2"
        );
    }

    #[tokio::test]
    async fn test_exchange_sends_form_and_returns_record() {
        let transport = StubTransport::new(vec![StubTransport::body(
            200,
            r#"{"code":1,"data":{"access_token":"T"}}"#,
        )]);
        let flow = flow(transport.clone()).with_api_domain("https://api.test/");

        let record = exchange(&flow).await.unwrap();
        assert_eq!(record.access_token.expose(), "T");
        assert_eq!(record.app_id.as_str(), "A1");
        assert_eq!(record.business_id.as_str(), "B1");

        let requests = transport.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://api.test/api/oauth/access_token");
        let keys: Vec<&str> = requests[0].form.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["version", "appId", "businessId", "accessCode"]);
        assert_eq!(requests[0].field_value("accessCode"), Some("CODE"));
    }

    async fn exchange_with(response: Result<HttpResponse, TransportError>) -> OAuthError {
        exchange(&flow(StubTransport::new(vec![response])))
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn test_exchange_error_kinds() {
        let error = exchange_with(Err(TransportError::Timeout(Duration::from_secs(30)))).await;
        assert!(matches!(error, OAuthError::Transport(TransportError::Timeout(_))));

        let error = exchange_with(StubTransport::body(500, "boom")).await;
        assert!(matches!(error, OAuthError::HttpStatus { status: 500 }));

        let error = exchange_with(StubTransport::body(200, "not json")).await;
        assert!(matches!(error, OAuthError::Decode { .. }));

        let error = exchange_with(StubTransport::body(200, r#"{"code":1,"data":{}}"#)).await;
        assert!(matches!(error, OAuthError::Protocol { .. }));

        let error =
            exchange_with(StubTransport::body(200, r#"{"code":0,"messages":["bad code"]}"#)).await;
        assert_eq!(error.messages(), ["bad code"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exchange_retries_server_errors() {
        let transport = StubTransport::new(vec![
            StubTransport::body(503, ""),
            StubTransport::body(200, r#"{"code":1,"data":{"access_token":"T"}}"#),
        ]);
        let flow = flow(transport.clone()).with_retry(RetryPolicy::with_retries(2));

        assert_eq!(exchange(&flow).await.unwrap().access_token.expose(), "T");
        assert_eq!(transport.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_exchange_rejects_empty_code() {
        let transport = StubTransport::new(vec![]);
        let flow = flow(transport.clone());

        let result = flow
            .exchange_access_code("  ", &AppId::new("A1"), &BusinessId::new("B1"), "2.0")
            .await;
        assert!(matches!(
            result,
            Err(OAuthError::MissingCredentials { field: "accessCode" })
        ));
        assert!(transport.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let flow = OAuthFlow::new(
            StubTransport::new(vec![]),
            Arc::new(FileTokenStore::new(dir.path().join("token.json"))),
        );

        assert!(flow.load_token().await.unwrap().is_none());

        let record = TokenRecord::issue(
            "T",
            AppId::new("A1"),
            BusinessId::new("B1"),
            flow.token_policy(),
        );
        flow.persist_token(&record).await.unwrap();

        let loaded = flow.load_token().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, record.access_token);
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_complete_handshake() {
        let transport = StubTransport::new(vec![StubTransport::body(
            200,
            r#"{"code":1,"data":{"access_token":"T"}}"#,
        )]);
        let flow = flow(transport);

        let mut handshake = Handshake::new(AppId::new("A1"), "2.0", "https://x.test/cb");
        handshake.start(&flow).unwrap();
        handshake
            .receive_callback(&CallbackParams::from_query("accessCode=CODE"))
            .unwrap();

        let record = flow
            .complete_handshake(&mut handshake, &BusinessId::new("B1"))
            .await
            .unwrap();
        assert_eq!(record.access_token.expose(), "T");
        assert_eq!(handshake.state(), &HandshakeState::TokenObtained);
        assert_eq!(flow.load_token().await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_failed_handshake_records_message() {
        let transport = StubTransport::new(vec![StubTransport::body(
            200,
            r#"{"code":0,"messages":["bad code"]}"#,
        )]);
        let flow = flow(transport);

        let mut handshake = Handshake::new(AppId::new("A1"), "2.0", "https://x.test/cb");
        handshake.start(&flow).unwrap();
        handshake
            .receive_callback(&CallbackParams::from_query("accessCode=CODE"))
            .unwrap();

        assert!(
            flow.complete_handshake(&mut handshake, &BusinessId::new("B1"))
                .await
                .is_err()
        );
        match handshake.state() {
            HandshakeState::ExchangeFailed { message } => assert!(message.contains("bad code")),
            other => panic!("unexpected state {:?}", other),
        }
    }
}
