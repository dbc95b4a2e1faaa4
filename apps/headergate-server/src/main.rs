mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use authn_delegate_sdk::AuthenticationDelegate;
use axum::{Json, Router, routing::get};
use clap::Parser;
use security_gateway::{CsrfToken, CurrentContext, CurrentIdentity, SecurityChain};
use serde_json::{Value, json};
use static_authn_delegate::{StaticAuthnDelegate, StaticAuthnDelegateConfig};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, LoggingConfig};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Demo server running an application behind the header pre-authentication chain.
#[derive(Parser, Debug)]
#[command(name = "headergate-server", version)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref())?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    init_logging(&cfg.logging)?;

    let mut builder = SecurityChain::builder(cfg.security.clone());
    if let Some(delegate) = select_delegate(&cfg) {
        builder = builder.delegate(delegate);
    }
    let chain = match builder.build() {
        Ok(chain) => chain,
        Err(e) => {
            tracing::error!(error = %e, "invalid security configuration");
            return Err(e.into());
        }
    };

    let app = chain.secure(routes());

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.bind_addr))?;
    tracing::info!(addr = %cfg.server.bind_addr, "headergate-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("headergate-server stopped");
    Ok(())
}

fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if cfg.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

/// A delegate is wired when pre-authentication is on or the delegate section
/// is configured explicitly.
fn select_delegate(cfg: &AppConfig) -> Option<Arc<dyn AuthenticationDelegate>> {
    match (&cfg.authn_delegate, cfg.security.enabled) {
        (Some(delegate_cfg), _) => Some(Arc::new(StaticAuthnDelegate::from_config(delegate_cfg))),
        (None, true) => {
            tracing::warn!(
                "no authn_delegate section; accepting every principal with default authorities"
            );
            Some(Arc::new(StaticAuthnDelegate::from_config(
                &StaticAuthnDelegateConfig::default(),
            )))
        }
        (None, false) => None,
    }
}

fn routes() -> Router {
    Router::new()
        .route("/api/whoami", get(whoami))
        .route("/api/context", get(context))
        .route("/api/csrf", get(csrf))
        .route("/actuator/health", get(health))
}

async fn whoami(CurrentIdentity(identity): CurrentIdentity) -> Json<Value> {
    Json(json!({
        "principal": identity.principal(),
        "authorities": identity.authorities(),
    }))
}

async fn context(CurrentContext(ctx): CurrentContext) -> Json<Value> {
    Json(json!({
        "authenticated": ctx.is_authenticated(),
        "principal": ctx.principal(),
    }))
}

async fn csrf(token: CsrfToken) -> Json<Value> {
    Json(json!({
        "header_name": token.header_name().as_str(),
        "token": token.token(),
    }))
}

async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown requested");
}
