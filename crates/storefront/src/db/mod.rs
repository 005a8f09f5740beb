//! Database operations for the storefront `PostgreSQL` database.
//!
//! # Schema: `shop`
//!
//! - `app_user`, `user_role` - Accounts and roles
//! - `product`, `product_variant`, `product_image`, `product_category`, `brand` - Catalog
//! - `cart`, `cart_item` - One cart per user, lines carry a price snapshot
//! - `shop_order`, `order_item`, `payment` - Placed orders
//! - `promo_code` - Checkout discounts
//! - `product_review`, `newsletter_subscriber`, `blog_post` - Content
//!
//! Sessions live in `tower_sessions.session`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p tennis-shop-cli -- migrate
//! ```

pub mod blog;
pub mod carts;
pub mod catalog;
pub mod newsletter;
pub mod orders;
pub mod promo;
pub mod reviews;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use blog::BlogRepository;
pub use carts::CartRepository;
pub use catalog::{NewImage, ProductFilter, ProductRepository};
pub use newsletter::NewsletterRepository;
pub use orders::OrderRepository;
pub use promo::PromoCodeRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map unique violations to [`RepositoryError::Conflict`], everything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
