//! Database migrations.
//!
//! Migration files live in `crates/storefront/migrations/` and are embedded
//! at compile time.

use sqlx::PgPool;

/// Apply pending storefront migrations.
///
/// # Errors
///
/// Returns an error if a migration fails or the history does not match the files.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(pool).await?;
    tracing::info!("Storefront migrations complete!");
    Ok(())
}
