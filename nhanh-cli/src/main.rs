//! Nhanh CLI
//!
//! Command-line interface for configuring and authorizing Nhanh.vn API access.
//!
//! # Usage
//!
//! ```bash
//! # Validate the configuration (environment variables by default)
//! nhanh check
//! nhanh --config nhanh.json check --oauth
//!
//! # Print the URL a shop owner visits to grant access
//! nhanh --config nhanh.json auth-url
//!
//! # Exchange the access code from the redirect and store the token
//! nhanh --config nhanh.json exchange --callback-url 'https://shop.test/cb?accessCode=...' --business-id 678
//!
//! # Show the stored token
//! nhanh token --format json
//!
//! # Keep the token in the OS keyring instead of a file
//! nhanh --config nhanh.json --keyring exchange C0DE --business-id 678
//! nhanh --keyring token --app-id 74951
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::commands::{OutputFormat, TokenLocation};

#[derive(Parser)]
#[command(name = "nhanh")]
#[command(about = "Configuration and OAuth tooling for the Nhanh.vn API")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (JSON, or TOML with a .toml extension); defaults to NHANH_* environment variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Token file; defaults to the platform config directory
    #[arg(long, global = true)]
    token_file: Option<PathBuf>,

    /// Store tokens in the OS keyring (memory only when no keyring is available)
    #[arg(long, global = true, conflicts_with = "token_file")]
    keyring: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and list every problem found
    Check {
        /// Validate for the OAuth handshake instead of API calls
        #[arg(long)]
        oauth: bool,
    },

    /// Print the authorization URL
    AuthUrl,

    /// Exchange an access code for an access token and store it
    Exchange {
        /// Access code from the redirect
        #[arg(required_unless_present = "callback_url", conflicts_with = "callback_url")]
        code: Option<String>,

        /// Full redirect URL received on the return link
        #[arg(long)]
        callback_url: Option<String>,

        /// Business the token is for (defaults to the configured business ID)
        #[arg(short, long)]
        business_id: Option<String>,
    },

    /// Show the stored access token
    Token {
        /// App whose token to show; required with --keyring
        #[arg(long)]
        app_id: Option<String>,

        /// Print the token value instead of redacting it
        #[arg(long)]
        reveal: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let location = if cli.keyring {
        TokenLocation::Keyring
    } else {
        TokenLocation::File(cli.token_file.as_deref())
    };

    match cli.command {
        Commands::Check { oauth } => commands::check(config, oauth),
        Commands::AuthUrl => commands::auth_url(config),
        Commands::Exchange {
            code,
            callback_url,
            business_id,
        } => {
            commands::exchange(
                config,
                location,
                code.as_deref(),
                callback_url.as_deref(),
                business_id.as_deref(),
            )
            .await
        }
        Commands::Token {
            app_id,
            reveal,
            format,
        } => commands::token(location, app_id.as_deref(), reveal, format).await,
    }
}
