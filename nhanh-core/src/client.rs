//! The client handle and its API modules.
//!
//! A [`Client`] owns one validated [`ClientConfig`], the HTTP transport, a
//! rate limiter shared by all modules, and a [`Logger`]. Modules are built
//! lazily on first use; replacing the logger rebuilds the whole set so no
//! module keeps a reference to the old one.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument::WithSubscriber;

use crate::config::ClientConfig;
use crate::error::NhanhError;
use crate::logging::Logger;
use crate::model::AppId;
use crate::oauth::response::decode_envelope;
use crate::oauth::{OAuthError, OAuthFlow};
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::store::TokenStore;
use crate::transport::{FormRequest, HttpTransport, ReqwestTransport};

/// Authenticated access to one API module (`/api/{module}/{action}`).
#[derive(Clone)]
pub struct ApiModule {
    name: &'static str,
    config: Arc<ClientConfig>,
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    logger: Logger,
}

impl ApiModule {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Call `action` with `data` and return the response's `data` value.
    ///
    /// Waits for a rate limiter permit before each attempt. Failures are
    /// classified like the token exchange; transient ones are retried.
    pub async fn call(&self, action: &str, data: &Value) -> Result<Value, OAuthError> {
        let business_id = self
            .config
            .business_id()
            .ok_or(OAuthError::MissingCredentials { field: "businessId" })?;
        let access_token = self
            .config
            .access_token()
            .ok_or(OAuthError::MissingCredentials { field: "accessToken" })?;

        let request = FormRequest::new(format!(
            "{}/api/{}/{}",
            self.config.api_domain(),
            self.name,
            action.trim_matches('/')
        ))
        .field("version", self.config.api_version())
        .field("appId", self.config.app_id().as_str())
        .field("businessId", business_id.as_str())
        .field("accessToken", access_token.expose())
        .field("data", data.to_string())
        .timeout(self.config.timeout())
        .validate_ssl(self.config.validate_ssl());

        let transport = &self.transport;
        let limiter = &self.limiter;
        let request = &request;
        let module = self.name;

        let call = async move {
            tracing::debug!(module, action, "calling API");
            let result = self
                .retry
                .run(move || async move {
                    limiter.acquire().await;
                    let reply = transport.post_form(request).await?;
                    decode_envelope(&reply)
                })
                .await;
            if let Err(e) = &result {
                tracing::warn!(module, action, "API call failed: {}", e);
            }
            result
        };

        if self.logger.is_noop() {
            call.await
        } else {
            call.with_subscriber(self.logger.dispatch().clone()).await
        }
    }
}

impl std::fmt::Debug for ApiModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiModule")
            .field("name", &self.name)
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

/// The domain modules of a client, all sharing one logger.
#[derive(Debug, Clone)]
pub struct Modules {
    pub products: ApiModule,
    pub customers: ApiModule,
    pub orders: ApiModule,
}

/// A configured connection to the platform.
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    logger: RwLock<Logger>,
    modules: RwLock<Option<Arc<Modules>>>,
}

impl Client {
    /// Create a client using the `reqwest` transport.
    pub fn new(config: ClientConfig) -> Result<Self, NhanhError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client using `transport`.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let limiter = RateLimiter::per_window(config.rate_limit());
        let retry = RetryPolicy::with_retries(config.retry_attempts());
        Self {
            config: Arc::new(config),
            transport,
            limiter: Arc::new(limiter),
            retry,
            logger: RwLock::new(Logger::noop()),
            modules: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn app_id(&self) -> &AppId {
        self.config.app_id()
    }

    pub fn logger(&self) -> Logger {
        self.logger.read().clone()
    }

    /// Replace the logger and rebuild every module against it.
    pub fn set_logger(&self, logger: Logger) {
        let modules = self.build_modules(&logger);
        *self.logger.write() = logger;
        *self.modules.write() = Some(Arc::new(modules));
    }

    /// The module set, built on first access.
    pub fn modules(&self) -> Arc<Modules> {
        if let Some(modules) = self.modules.read().as_ref() {
            return modules.clone();
        }

        let mut slot = self.modules.write();
        slot.get_or_insert_with(|| Arc::new(self.build_modules(&self.logger.read())))
            .clone()
    }

    pub fn products(&self) -> ApiModule {
        self.modules().products.clone()
    }

    pub fn customers(&self) -> ApiModule {
        self.modules().customers.clone()
    }

    pub fn orders(&self) -> ApiModule {
        self.modules().orders.clone()
    }

    /// An OAuth flow sharing this client's transport and settings.
    pub fn oauth_flow(&self, store: Arc<dyn TokenStore>) -> OAuthFlow {
        OAuthFlow::from_config(&self.config, self.transport.clone(), store)
    }

    fn build_modules(&self, logger: &Logger) -> Modules {
        let module = |name| ApiModule {
            name,
            config: self.config.clone(),
            transport: self.transport.clone(),
            limiter: self.limiter.clone(),
            retry: self.retry.clone(),
            logger: logger.clone(),
        };
        Modules {
            products: module("product"),
            customers: module("customer"),
            orders: module("order"),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("logger", &*self.logger.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigMode, LogLevel, LoggingConfig, RawConfig, validate};
    use crate::store::Secret;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(domain: &str, mode: ConfigMode) -> ClientConfig {
        let raw = RawConfig {
            app_id: Some("A1".to_string()),
            business_id: Some("B1".to_string()),
            access_token: Some(Secret::new("TOK")),
            secret_key: Some(Secret::new("S")),
            return_link: Some("https://x.test/cb".to_string()),
            api_domain: Some(domain.to_string()),
            retry_attempts: Some(0),
            ..RawConfig::default()
        };
        validate(&raw, mode).unwrap()
    }

    fn client(domain: &str) -> Client {
        Client::new(config(domain, ConfigMode::ApiCall)).unwrap()
    }

    #[test]
    fn test_modules_are_built_lazily_and_reused() {
        let client = client("https://api.test");
        let first = client.modules();
        let second = client.modules();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(client.products().name(), "product");
        assert_eq!(client.orders().name(), "order");
    }

    #[test]
    fn test_set_logger_rebuilds_every_module() {
        let client = client("https://api.test");
        let before = client.modules();
        assert!(before.customers.logger().is_noop());

        client.set_logger(Logger::from_config(&LoggingConfig {
            enabled: true,
            level: LogLevel::Debug,
            ..LoggingConfig::default()
        }));

        let after = client.modules();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(!after.products.logger().is_noop());
        assert!(!after.customers.logger().is_noop());
        assert!(!after.orders.logger().is_noop());
        assert!(!client.logger().is_noop());
    }

    #[tokio::test]
    async fn test_module_call_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/product/search"))
            .and(body_string_contains("businessId=B1"))
            .and(body_string_contains("accessToken=TOK"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"code":1,"data":{"products":{"1":{"name":"Tea"}}}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let data = client
            .products()
            .call("search", &serde_json::json!({"page": 1}))
            .await
            .unwrap();

        assert_eq!(data["products"]["1"]["name"], "Tea");
    }

    #[tokio::test]
    async fn test_module_call_reports_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"code":0,"messages":["accessToken expired"]}"#),
            )
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let error = client
            .orders()
            .call("index", &Value::Null)
            .await
            .unwrap_err();

        assert_eq!(error.messages(), ["accessToken expired"]);
    }

    #[tokio::test]
    async fn test_oauth_client_cannot_call_modules() {
        let raw = RawConfig {
            app_id: Some("A1".to_string()),
            secret_key: Some(Secret::new("S")),
            return_link: Some("https://x.test/cb".to_string()),
            ..RawConfig::default()
        };
        let client = Client::new(validate(&raw, ConfigMode::OAuth).unwrap()).unwrap();

        let result = client.customers().call("search", &Value::Null).await;
        assert!(matches!(
            result,
            Err(OAuthError::MissingCredentials { field: "businessId" })
        ));
    }
}
