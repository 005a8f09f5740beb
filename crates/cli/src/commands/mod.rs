//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Missing environment variable: STOREFRONT_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Database URL from `STOREFRONT_DATABASE_URL`, then `DATABASE_URL`.
fn database_url() -> Result<SecretString, ConnectError> {
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingDatabaseUrl)
}

/// Open a small pool for a one-off command.
///
/// # Errors
///
/// Returns an error if the URL is not set or the database is unreachable.
pub async fn connect() -> Result<PgPool, ConnectError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(url.expose_secret())
        .await?;
    Ok(pool)
}
