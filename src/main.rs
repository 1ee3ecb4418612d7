use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use intake_api::auth::{IdentityProvider, IntrospectionVerifier, JwtSecretVerifier};
use intake_api::config::{self, AppConfig};
use intake_api::database::{MemorySeed, MemoryStore, PostgrestStore, Store};
use intake_api::AppState;

#[derive(Debug, Parser)]
#[command(name = "intake-api", version, about = "Dataset intake API")]
struct Args {
    /// Port to listen on (overrides INTAKE_API_PORT / PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Interface to bind (overrides INTAKE_API_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Serve from a process-local store instead of the hosted database
    #[arg(long)]
    in_memory: bool,

    /// JSON fixture of app_users, clients and grants for --in-memory
    #[arg(long, requires = "in_memory")]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SUPABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("intake_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = config::config().clone();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }
    tracing::info!("Starting intake API in {:?} mode", config.environment);

    let (store, identity) = build_backends(&config, &args)?;

    let bind_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid bind address")?;

    let app = intake_api::app(AppState::new(config, store, identity));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Intake API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn build_backends(
    config: &AppConfig,
    args: &Args,
) -> anyhow::Result<(Arc<dyn Store>, Arc<dyn IdentityProvider>)> {
    if args.in_memory {
        let Some(secret) = config.supabase.jwt_secret.as_deref() else {
            bail!("--in-memory requires SUPABASE_JWT_SECRET to verify tokens locally");
        };

        let store: Arc<dyn Store> = match &args.seed {
            Some(path) => {
                let seed = MemorySeed::from_file(path)
                    .with_context(|| format!("failed to load seed {}", path.display()))?;
                Arc::new(MemoryStore::seeded(seed))
            }
            None => Arc::new(MemoryStore::new()),
        };
        tracing::warn!("Serving from the in-memory store; data is lost on exit");

        let identity: Arc<dyn IdentityProvider> = Arc::new(JwtSecretVerifier::new(secret));
        return Ok((store, identity));
    }

    config.supabase.validate()?;

    let http = reqwest::Client::builder()
        .timeout(config.supabase.timeout())
        .build()
        .context("failed to build HTTP client")?;

    let store: Arc<dyn Store> = Arc::new(PostgrestStore::new(http.clone(), &config.supabase)?);

    let identity: Arc<dyn IdentityProvider> = match config.supabase.jwt_secret.as_deref() {
        Some(secret) => {
            tracing::info!("Verifying bearer tokens with the project JWT secret");
            Arc::new(JwtSecretVerifier::new(secret))
        }
        None => {
            tracing::info!("Verifying bearer tokens via the auth API");
            Arc::new(IntrospectionVerifier::new(http, &config.supabase)?)
        }
    };

    Ok((store, identity))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
