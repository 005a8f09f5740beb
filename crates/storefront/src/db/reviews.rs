//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tennis_shop_core::{ProductId, ReviewId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::review::Review;

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    full_name: String,
    rating: i32,
    comment: String,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            full_name: row.full_name,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, product_id, user_id, full_name, rating, comment, created_at
             FROM shop.product_review
             WHERE product_id = $1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed this product.
    pub async fn create(
        &self,
        product_id: ProductId,
        user_id: UserId,
        full_name: &str,
        rating: i32,
        comment: &str,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "INSERT INTO shop.product_review (product_id, user_id, full_name, rating, comment)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, product_id, user_id, full_name, rating, comment, created_at",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(full_name)
        .bind(rating)
        .bind(comment)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "review"))?;
        Ok(row.into())
    }

    /// Average rating and review count for a product. The average is `None`
    /// without reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn rating_summary(
        &self,
        product_id: ProductId,
    ) -> Result<(Option<f64>, i64), RepositoryError> {
        let summary = sqlx::query_as::<_, (Option<f64>, i64)>(
            "SELECT AVG(rating)::FLOAT8, COUNT(*) FROM shop.product_review WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(summary)
    }
}
