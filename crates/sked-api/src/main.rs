//! sked API Server
//!
//! REST API server for sked account authentication.

use anyhow::Context;
use clap::Parser;
use sked_api::{auth::AuthService, create_router, mail::LogMailer, state::AppState};
use sked_core::{config::AppConfig, CredentialStore, SessionStore};
use sked_store::{MemoryStore, SurrealStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sked-api")]
#[command(about = "sked account authentication server")]
#[command(version)]
struct Cli {
    /// TOML config file; environment variables override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep accounts and sessions in process memory instead of SurrealDB
    #[arg(long)]
    memory: bool,
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},sked_api=debug,tower_http=debug",
            config.logging.level
        ))
    });

    if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    state.set_ready(false);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate().context("invalid configuration")?;

    init_tracing(&config);

    if config.auth.uses_development_secrets() {
        tracing::warn!(
            "Built-in development JWT secrets are in use; set JWT_ACCESS_SECRET and JWT_REFRESH_SECRET"
        );
    }

    // Select the store backend
    let (users, sessions): (Arc<dyn CredentialStore>, Arc<dyn SessionStore>) = if cli.memory {
        tracing::warn!("Using in-memory store; accounts are lost on restart");
        let store = Arc::new(MemoryStore::new());
        (store.clone(), store)
    } else {
        let store = Arc::new(
            SurrealStore::connect(&config.database)
                .await
                .context("failed to connect to SurrealDB")?,
        );
        store.init_schema().await.context("failed to initialize schema")?;
        (store.clone(), store)
    };

    let auth = AuthService::new(&config, users, sessions, Arc::new(LogMailer))?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config, auth));

    // Create router
    let app = create_router(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("sked API Server starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}
