//! User management commands.

use sqlx::PgPool;
use thiserror::Error;

use tennis_shop_core::{Email, Role};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("No user with email: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Grant the Admin role to the account with `email`.
///
/// # Errors
///
/// Returns `UserError::NotFound` if no account uses the address.
pub async fn promote(pool: &PgPool, email: &str) -> Result<(), UserError> {
    let email = Email::parse(email).map_err(|_| UserError::InvalidEmail(email.to_owned()))?;

    let updated = sqlx::query_scalar::<_, i32>(
        "UPDATE shop.app_user SET role_id = $2 WHERE lower(email) = lower($1) RETURNING id",
    )
    .bind(email.as_str())
    .bind(Role::ADMIN_ID)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(id) => {
            tracing::info!(user_id = id, email = %email, "User promoted to admin");
            Ok(())
        }
        None => Err(UserError::NotFound(email.to_string())),
    }
}
