//! APS CLI
//!
//! Command-line interface for Autodesk Platform Services.
//!
//! # Usage
//!
//! ```bash
//! # Get a two-legged token (client id/secret from config or APS_CLIENT_ID / APS_CLIENT_SECRET)
//! aps token --scope data:read
//!
//! # Build a login URL for the authorization code flow
//! aps authorize-url --redirect-uri http://localhost:8080/callback --pkce
//!
//! # List the projects of an ACC account
//! aps projects 0f1e2d3c-account-id
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use aps_client::vault::{VaultClient, VaultCredentials};
use aps_client::{ApsClient, ItemVersionsOptions, ListProjectsOptions, RequestContext};
use aps_core::auth::{AuthorizeOptions, generate_random_string};
use aps_core::{AuthenticationClient, InMemoryTokenStore, PkcePair, Secret};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::CliConfig;

/// Length of the generated `state` value.
const STATE_LENGTH: usize = 32;

#[derive(Parser)]
#[command(name = "aps")]
#[command(about = "Command-line access to Autodesk Platform Services")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get a two-legged access token
    Token {
        /// Scope to request (repeatable); defaults to the configured scopes
        #[arg(short, long)]
        scope: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the authorization URL for a three-legged login
    AuthorizeUrl {
        /// Redirect URI; defaults to the configured one
        #[arg(short, long)]
        redirect_uri: Option<String>,

        /// Scope to request (repeatable)
        #[arg(short, long)]
        scope: Vec<String>,

        /// Add a PKCE challenge and print its verifier
        #[arg(long)]
        pkce: bool,

        /// State value echoed back to the redirect URI
        #[arg(long)]
        state: Option<String>,

        /// OpenID Connect nonce
        #[arg(long)]
        nonce: Option<String>,

        /// Always show the login page
        #[arg(long)]
        force_login: bool,
    },

    /// Print the authorization code contained in a redirect URL
    ExtractCode {
        /// The URL the browser was redirected to
        callback_url: String,
    },

    /// Exchange an authorization code for a three-legged token
    ExchangeCode {
        /// Authorization code
        code: String,

        /// Redirect URI used for the authorization URL
        #[arg(short, long)]
        redirect_uri: Option<String>,

        /// PKCE verifier printed by `authorize-url --pkce`
        #[arg(long, env = "APS_CODE_VERIFIER", hide_env_values = true)]
        code_verifier: Option<String>,
    },

    /// List the projects of an ACC account
    Projects {
        /// Account id (hub id without the `b.` prefix)
        account_id: String,

        /// `Region` header (US, EMEA, AUS, ...)
        #[arg(long)]
        region: Option<String>,

        /// Act on behalf of this user
        #[arg(long)]
        user_id: Option<String>,

        /// Stop after this many projects
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List the item versions of a Vault
    ItemVersions {
        /// Vault server base URL, e.g. http://vault.local
        vault_server: String,

        /// Vault id
        vault_id: String,

        /// Vault name to sign in to
        #[arg(long, default_value = "Vault")]
        vault: String,

        /// Vault user name
        #[arg(short, long, default_value = "Administrator")]
        user: String,

        /// Vault user password
        #[arg(long, env = "APS_VAULT_PASSWORD", hide_env_values = true, default_value = "")]
        password: String,

        /// Only the latest version of each item
        #[arg(long)]
        latest_only: bool,

        /// Stop after this many versions
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?;
    init_logging(&config.log_level, cli.verbose);
    info!("Loaded configuration from {:?}", config.config_path);

    match cli.command {
        Commands::Token { scope, format } => token(&config, scope, &format).await,
        Commands::AuthorizeUrl {
            redirect_uri,
            scope,
            pkce,
            state,
            nonce,
            force_login,
        } => {
            let options = AuthorizeOptions {
                nonce,
                state: Some(state.unwrap_or_else(|| generate_random_string(STATE_LENGTH))),
                force_login,
            };
            authorize_url(&config, redirect_uri, scope, pkce, &options)
        }
        Commands::ExtractCode { callback_url } => extract_code(&callback_url),
        Commands::ExchangeCode {
            code,
            redirect_uri,
            code_verifier,
        } => exchange_code(&config, &code, redirect_uri, code_verifier).await,
        Commands::Projects {
            account_id,
            region,
            user_id,
            limit,
        } => {
            let context = RequestContext { region, user_id };
            list_projects(&config, &account_id, context, limit).await
        }
        Commands::ItemVersions {
            vault_server,
            vault_id,
            vault,
            user,
            password,
            latest_only,
            limit,
        } => {
            let credentials = VaultCredentials {
                vault,
                user_name: user,
                password: Secret::new(password),
                app_code: Some("aps-cli".to_string()),
            };
            list_item_versions(&vault_server, &vault_id, credentials, latest_only, limit).await
        }
    }
}

fn init_logging(default_level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn scopes_or_default(config: &CliConfig, scopes: Vec<String>) -> Vec<String> {
    if scopes.is_empty() {
        config.scopes.clone()
    } else {
        scopes
    }
}

fn redirect_uri_or_default(config: &CliConfig, redirect_uri: Option<String>) -> Result<String> {
    redirect_uri
        .or_else(|| config.redirect_uri.clone())
        .context("no redirect URI given and none configured")
}

async fn token(config: &CliConfig, scopes: Vec<String>, format: &str) -> Result<()> {
    let auth = AuthenticationClient::with_endpoints(config.endpoints());
    let scopes = scopes_or_default(config, scopes);

    let token = auth
        .exchange_client_credentials(
            config.require_client_id()?,
            config.require_client_secret()?,
            &scopes,
        )
        .await
        .context("failed to obtain a two-legged token")?;

    match format {
        "json" => {
            let output = serde_json::json!({
                "access_token": token.access_token().expose(),
                "token_type": token.token().token_type,
                "expires_at": token.expires_at().to_rfc3339(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("{}", token.access_token().expose());
        }
    }
    Ok(())
}

fn authorize_url(
    config: &CliConfig,
    redirect_uri: Option<String>,
    scopes: Vec<String>,
    pkce: bool,
    options: &AuthorizeOptions,
) -> Result<()> {
    let auth = AuthenticationClient::with_endpoints(config.endpoints());
    let client_id = config.require_client_id()?;
    let redirect_uri = redirect_uri_or_default(config, redirect_uri)?;
    let scopes = scopes_or_default(config, scopes);

    if pkce {
        let pair = PkcePair::generate();
        let url = auth.build_pkce_authorization_url(
            client_id,
            &redirect_uri,
            &scopes,
            &pair.challenge,
            options,
        );
        println!("{}", url);
        eprintln!("code_verifier: {}", pair.verifier.expose());
    } else {
        println!(
            "{}",
            auth.build_authorization_url(client_id, &redirect_uri, &scopes, options)
        );
    }

    if let Some(state) = &options.state {
        eprintln!("state: {}", state);
    }
    Ok(())
}

fn extract_code(callback_url: &str) -> Result<()> {
    match aps_core::auth::extract_authorization_code(callback_url) {
        Some(code) => {
            println!("{}", code);
            Ok(())
        }
        None => bail!("no authorization code in {}", callback_url),
    }
}

async fn exchange_code(
    config: &CliConfig,
    code: &str,
    redirect_uri: Option<String>,
    code_verifier: Option<String>,
) -> Result<()> {
    let auth = AuthenticationClient::with_endpoints(config.endpoints());
    let redirect_uri = redirect_uri_or_default(config, redirect_uri)?;
    let verifier = code_verifier.map(Secret::new);

    let token = auth
        .exchange_authorization_code(
            config.require_client_id()?,
            config.client_secret.as_ref(),
            code,
            &redirect_uri,
            verifier.as_ref(),
        )
        .await
        .context("failed to exchange the authorization code")?;

    let output = serde_json::json!({
        "access_token": token.access_token().expose(),
        "refresh_token": token.refresh_token().map(|t| t.expose()),
        "expires_at": token.expires_at().to_rfc3339(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn list_projects(
    config: &CliConfig,
    account_id: &str,
    context: RequestContext,
    limit: Option<usize>,
) -> Result<()> {
    let auth = AuthenticationClient::with_endpoints(config.endpoints());
    let provider = auth.auto_refreshing(
        config.require_client_id()?,
        config.require_client_secret()?.clone(),
        config.scopes.clone(),
        Arc::new(InMemoryTokenStore::new()),
    );

    let client = ApsClient::builder(Arc::new(provider))
        .endpoints(config.endpoints())
        .timeout(config.timeout())
        .build()?;

    let options = ListProjectsOptions {
        page_size: Some(config.page_size),
        context,
        ..Default::default()
    };

    let mut projects = client
        .projects()
        .list_projects(account_id, &options)
        .take(limit.unwrap_or(usize::MAX));

    let mut count = 0;
    while let Some(project) = projects.next().await {
        let project = project.context("failed to list projects")?;
        println!(
            "{}\t{}\t{}",
            project.id,
            project.status.as_deref().unwrap_or("-"),
            project.name.as_deref().unwrap_or("")
        );
        count += 1;
    }

    info!("Listed {} projects", count);
    Ok(())
}

async fn list_item_versions(
    vault_server: &str,
    vault_id: &str,
    credentials: VaultCredentials,
    latest_only: bool,
    limit: Option<usize>,
) -> Result<()> {
    let vault = VaultClient::with_user_account(vault_server, credentials);
    let options = ItemVersionsOptions {
        latest_only: latest_only.then_some(true),
        ..Default::default()
    };

    let mut versions = vault
        .items()
        .list_item_versions(vault_id, &options)
        .take(limit.unwrap_or(usize::MAX));

    let mut count = 0;
    while let Some(version) = versions.next().await {
        let version = version.context("failed to list item versions")?;
        println!(
            "{}\t{}\t{}",
            version.id,
            version.number.as_deref().unwrap_or("-"),
            version.name.as_deref().unwrap_or("")
        );
        count += 1;
    }

    info!("Listed {} item versions", count);
    Ok(())
}
