use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use journal_api::auth::JwtSessionResolver;
use journal_api::config::AppConfig;
use journal_api::database::{manager, PgStore};
use journal_api::{embeddings, router, AppState};

#[derive(Parser)]
#[command(name = "journal-api")]
#[command(about = "Journal and user profile API")]
#[command(version)]
struct Args {
    #[arg(long, env = "JOURNAL_API_HOST", default_value = "0.0.0.0", help = "Address to bind")]
    host: String,

    #[arg(long, env = "JOURNAL_API_PORT", default_value_t = 3000, help = "Port to listen on")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SUPABASE_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env();
    tracing::info!("Starting Journal API in {:?} mode", config.environment);

    let pool = manager::connect(&config.database).context("failed to configure database pool")?;
    let sessions = JwtSessionResolver::from_config(&config.auth).context("SUPABASE_JWT_SECRET must be set")?;
    let embeddings = embeddings::from_config(&config.embeddings);

    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(PgStore::new(pool)),
        sessions: Arc::new(sessions),
        embeddings,
    };

    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Journal API listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await.context("server error")?;
    Ok(())
}
