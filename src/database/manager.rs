use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::store::StoreError;

/// Builds the shared connection pool for the hosted Postgres instance.
///
/// The pool connects lazily so the API can start (and report a degraded
/// `/health`) while the database is unreachable.
pub fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let url = config.url.as_deref().ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout))
        .connect_lazy(url)?;

    info!(
        "Configured database pool (max_connections={}, timeout={}s)",
        config.max_connections, config.connection_timeout
    );
    Ok(pool)
}

/// Pings the pool to ensure connectivity
pub async fn health_check(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
