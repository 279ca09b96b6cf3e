//! Subcommand implementations.

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use std::path::Path;
use std::sync::Arc;

use nhanh_core::store::create_store;
use nhanh_core::{
    AppId, BusinessId, CallbackParams, ClientBuilder, ClientConfig, ConfigurationError, EnvVars,
    FileTokenStore, OAuthFlow, ReqwestTransport, SecretTokenStore, TokenRecord, TokenStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Builder seeded from `config`, or from the process environment.
fn load_builder(config: Option<&Path>) -> Result<ClientBuilder> {
    match config {
        Some(path) => ClientBuilder::from_config_file(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(ClientBuilder::from_environment(&EnvVars::from_process())),
    }
}

fn oauth_config(config: Option<&Path>) -> Result<ClientConfig> {
    load_builder(config)?
        .oauth_mode()
        .validate()
        .map_err(|e| anyhow!("invalid OAuth configuration:\n{}", render_violations(&e)))
}

/// Where tokens are persisted.
#[derive(Debug, Clone, Copy)]
pub enum TokenLocation<'a> {
    File(Option<&'a Path>),
    Keyring,
}

/// Open the token store for `app_id` and describe where it lives.
pub fn token_store(
    location: TokenLocation<'_>,
    app_id: Option<&AppId>,
) -> Result<(Box<dyn TokenStore>, String)> {
    match location {
        TokenLocation::File(path) => {
            let store = match path {
                Some(path) => FileTokenStore::new(path),
                None => FileTokenStore::at_default_path().context("no default token location")?,
            };
            let description = store.path().display().to_string();
            let store: Box<dyn TokenStore> = Box::new(store);
            Ok((store, description))
        }
        TokenLocation::Keyring => {
            let app_id = app_id.context("an app ID is required to use the keyring")?;
            let store: Box<dyn TokenStore> =
                Box::new(SecretTokenStore::new(create_store(true), app_id));
            Ok((store, format!("the keyring for app {}", app_id)))
        }
    }
}

pub fn render_violations(error: &ConfigurationError) -> String {
    error
        .violations
        .iter()
        .map(|v| format!("  - {}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn check(config: Option<&Path>, oauth: bool) -> Result<()> {
    let mut builder = load_builder(config)?;
    if oauth {
        builder = builder.oauth_mode();
    }

    match builder.validate() {
        Ok(config) => {
            println!("Configuration OK");
            println!("  Mode: {}", config.mode());
            println!("  App ID: {}", config.app_id());
            println!("  API: {} (version {})", config.api_domain(), config.api_version());
            println!("  Environment: {}", config.environment());
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration has {} problem(s):", e.violations.len());
            eprintln!("{}", render_violations(&e));
            bail!("configuration is invalid")
        }
    }
}

pub fn auth_url(config: Option<&Path>) -> Result<()> {
    let config = oauth_config(config)?;
    let return_link = config
        .return_link()
        .context("returnLink is required to build the authorization URL")?;

    println!(
        "{}",
        nhanh_core::authorization_url(
            nhanh_core::oauth::AUTHORIZE_URL,
            config.app_id(),
            config.api_version(),
            return_link,
        )
    );
    Ok(())
}

/// The access code from either the argument or a callback URL.
pub fn access_code(code: Option<&str>, callback_url: Option<&str>) -> Result<String> {
    if let Some(code) = code {
        return Ok(code.to_string());
    }

    let url = callback_url.context("either an access code or --callback-url is required")?;
    let params = CallbackParams::from_url(url)?;
    if let Some(error) = params.error {
        bail!(
            "authorization was refused: {}",
            params.error_description.unwrap_or(error)
        );
    }
    params
        .access_code
        .context("callback URL carries no accessCode parameter")
}

pub async fn exchange(
    config: Option<&Path>,
    location: TokenLocation<'_>,
    code: Option<&str>,
    callback_url: Option<&str>,
    business_id: Option<&str>,
) -> Result<()> {
    let config = oauth_config(config)?;
    let code = access_code(code, callback_url)?;
    let business_id = business_id
        .map(BusinessId::new)
        .or_else(|| config.business_id().cloned())
        .context("--business-id is required when no business ID is configured")?;

    let (store, location) = token_store(location, Some(config.app_id()))?;
    tracing::debug!(%location, "using token store");
    let flow = OAuthFlow::from_config(&config, Arc::new(ReqwestTransport::new()?), Arc::from(store));

    let record = flow
        .exchange_access_code(&code, config.app_id(), &business_id, config.api_version())
        .await?;
    flow.persist_token(&record).await?;

    println!("Access token stored in {}", location);
    println!("  Expires: {}", record.expires_at.to_rfc3339());
    Ok(())
}

pub async fn token(
    location: TokenLocation<'_>,
    app_id: Option<&str>,
    reveal: bool,
    format: OutputFormat,
) -> Result<()> {
    let app_id = app_id.map(AppId::new);
    let (store, location) = token_store(location, app_id.as_ref())?;
    let record = store
        .load()
        .await?
        .with_context(|| format!("no token stored in {}", location))?;

    println!("{}", render_token(&record, reveal, format)?);
    Ok(())
}

pub fn render_token(record: &TokenRecord, reveal: bool, format: OutputFormat) -> Result<String> {
    let token = if reveal {
        record.access_token.expose().to_string()
    } else {
        record.access_token.to_string()
    };
    let status = if record.is_expired() {
        "expired"
    } else if record.expires_within(chrono::Duration::days(3)) {
        "expiring soon"
    } else {
        "valid"
    };

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
            "access_token": token,
            "app_id": record.app_id,
            "business_id": record.business_id,
            "created_at": record.created_at,
            "expires_at": record.expires_at,
            "status": status,
        }))?),
        OutputFormat::Text => Ok([
            format!("App ID: {}", record.app_id),
            format!("Business ID: {}", record.business_id),
            format!("Created: {}", record.created_at.to_rfc3339()),
            format!("Expires: {} ({})", record.expires_at.to_rfc3339(), status),
            format!("Token: {}", token),
        ]
        .join("\n")),
    }
}
