//! Lending Service - HTTP API for digital loan applications
//!
//! This is the main entry point for the lending service.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lending_service::{create_router, register_client, AppState, Registration, ScoringClient, ServiceConfig};
use lending_store::{MemoryStore, PgStore, Store};

#[derive(Parser, Debug)]
#[command(name = "lending-service", about = "Digital lending orchestrator", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve,
    /// Register this service with the scoring engine and store the client token
    RegisterClient,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lending=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        database_configured = %config.database_url.is_some(),
        cbs_kyc_configured = %config.cbs.kyc_url.is_some(),
        cbs_transactions_configured = %config.cbs.transactions_url.is_some(),
        scoring_configured = %config.scoring.base_url.is_some(),
        "Service configuration loaded"
    );

    let store = open_store(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(store, config).await,
        Command::RegisterClient => {
            let scoring = ScoringClient::new(&config.scoring)?;
            match register_client(store.as_ref(), &scoring, &config).await? {
                Registration::Existing(_) => {}
                Registration::Created(registration) => {
                    if config.database_url.is_none() {
                        tracing::warn!(
                            client_id = registration.client_id,
                            "DATABASE_URL is not set - the registration will not survive this process"
                        );
                    }
                }
            }
            Ok(())
        }
    }
}

async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    if let Some(url) = &config.database_url {
        tracing::info!("Connecting to PostgreSQL");
        let store = PgStore::connect(url, config.database_max_connections).await?;
        store.migrate().await?;
        return Ok(Arc::new(store));
    }

    tracing::warn!("DATABASE_URL not set - using in-memory store, state is lost on exit");
    Ok(Arc::new(MemoryStore::new()))
}

async fn serve(store: Arc<dyn Store>, config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting Lending Service");

    let registration = store.get_client_registration().await?;

    // Build app state
    let state = AppState::new(store, config.clone(), registration);

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
