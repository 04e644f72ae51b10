//! Operator CLI: evaluate one CheckAccess request against the configured PDP
//! and print the decision as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use checkaccess::{PdpClientConfig, RemotePdpClientImpl, StaticTokenCredential};
use checkaccess_sdk::{
    CallContext, RemotePdpClient, TokenCredential, create_authorization_request,
};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bearer token presented to the PDP.
const BEARER_TOKEN_ENV: &str = "CHECKACCESS_BEARER_TOKEN";

#[derive(Parser)]
#[command(name = "checkaccess", version)]
#[command(about = "Ask the remote CheckAccess PDP for access decisions")]
struct Cli {
    /// YAML config file; `CHECKACCESS__*` variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Endpoint override, including the `api-version` query
    #[arg(long)]
    endpoint: Option<String>,

    /// Scope override
    #[arg(long)]
    scope: Option<String>,

    /// Resource to check
    #[arg(long)]
    resource: String,

    /// Action to check; repeat for several
    #[arg(long = "action", required = true)]
    actions: Vec<String>,

    /// Identity token of the subject being checked
    #[arg(long)]
    user_token: String,

    /// Limit for the whole call, retries included
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config =
        PdpClientConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(scope) = cli.scope {
        config.scope = scope;
    }

    let credential = std::env::var(BEARER_TOKEN_ENV).ok().map(|token| {
        Arc::new(StaticTokenCredential::new(token)) as Arc<dyn TokenCredential>
    });
    if credential.is_none() {
        tracing::warn!("{BEARER_TOKEN_ENV} is not set");
    }
    let client = RemotePdpClientImpl::from_config(&config, credential)
        .context("Failed to create CheckAccess client")?;

    let request = create_authorization_request(&cli.resource, &cli.actions, &cli.user_token)
        .context("Failed to build authorization request")?;

    let cancel = CancellationToken::new();
    let ctx = CallContext::new().with_cancellation(cancel.clone());
    let ctx = if let Some(ms) = cli.timeout_ms {
        ctx.with_timeout(Duration::from_millis(ms))
    } else {
        ctx
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling request");
            cancel.cancel();
        }
    });

    tracing::info!(endpoint = client.endpoint(), resource = %cli.resource, "Checking access");
    let response = client
        .check_access(&ctx, &request)
        .await
        .context("CheckAccess call failed")?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
