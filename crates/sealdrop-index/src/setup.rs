//! Database pool construction and migrations.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use sealdrop_core::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connects to Postgres and runs pending migrations.
pub async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set for the postgres index backend")?;

    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Running database migrations...");

    let migrations_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_path)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database ready");
    Ok(pool)
}
