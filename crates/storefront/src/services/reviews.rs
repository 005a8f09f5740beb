//! Product reviews.

use sqlx::PgPool;
use thiserror::Error;

use tennis_shop_core::ProductId;

use crate::db::{ProductRepository, RepositoryError, ReviewRepository};
use crate::models::{CurrentUser, Review};

pub const MAX_COMMENT_CHARS: usize = 1000;
pub const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Rating must be between 1 and 5.")]
    InvalidRating,

    #[error("Please write a comment.")]
    EmptyComment,

    #[error("Comments are limited to {MAX_COMMENT_CHARS} characters.")]
    CommentTooLong,

    #[error("You have already reviewed this product.")]
    AlreadyReviewed,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ReviewError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(_) => Self::AlreadyReviewed,
            other => Self::Repository(other),
        }
    }
}

/// Reviews shown on a product page.
#[derive(Debug, Clone, Default)]
pub struct ProductReviews {
    pub reviews: Vec<Review>,
    pub average_rating: Option<f64>,
    pub count: i64,
}

pub struct ReviewService<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews for a product, newest first, with the average rating.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Repository` if a query fails.
    pub async fn list_for_product(&self, product_id: ProductId) -> Result<ProductReviews, ReviewError> {
        let repo = ReviewRepository::new(self.pool);
        let reviews = repo.list_for_product(product_id).await?;
        let (average_rating, count) = repo.rating_summary(product_id).await?;
        Ok(ProductReviews {
            reviews,
            average_rating,
            count,
        })
    }

    /// Add `user`'s review of a product. A user may review a product once.
    ///
    /// # Errors
    ///
    /// Returns a validation variant, `ReviewError::ProductNotFound` or
    /// `ReviewError::AlreadyReviewed`.
    pub async fn add(
        &self,
        user: &CurrentUser,
        product_id: ProductId,
        rating: i32,
        comment: &str,
    ) -> Result<Review, ReviewError> {
        let comment = validate(rating, comment)?;

        if ProductRepository::new(self.pool).get(product_id).await?.is_none() {
            return Err(ReviewError::ProductNotFound);
        }

        let full_name: String = user.full_name.trim().chars().take(MAX_NAME_CHARS).collect();
        let review = ReviewRepository::new(self.pool)
            .create(product_id, user.id, &full_name, rating, comment)
            .await?;
        tracing::info!(product_id = %product_id, user_id = %user.id, rating, "Review added");
        Ok(review)
    }
}

/// Check the rating range and return the trimmed comment.
///
/// # Errors
///
/// Returns the first failing rule.
pub fn validate(rating: i32, comment: &str) -> Result<&str, ReviewError> {
    if !(1..=5).contains(&rating) {
        return Err(ReviewError::InvalidRating);
    }
    let comment = comment.trim();
    if comment.is_empty() {
        return Err(ReviewError::EmptyComment);
    }
    if comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(ReviewError::CommentTooLong);
    }
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_must_be_one_to_five() {
        assert!(matches!(validate(0, "ok"), Err(ReviewError::InvalidRating)));
        assert!(matches!(validate(6, "ok"), Err(ReviewError::InvalidRating)));
        assert!(validate(1, "ok").is_ok());
        assert!(validate(5, "ok").is_ok());
    }

    #[test]
    fn test_comment_is_trimmed_and_bounded() {
        assert_eq!(validate(4, "  Great grip  ").ok(), Some("Great grip"));
        assert!(matches!(validate(4, "   "), Err(ReviewError::EmptyComment)));

        let long = "a".repeat(MAX_COMMENT_CHARS + 1);
        assert!(matches!(validate(4, &long), Err(ReviewError::CommentTooLong)));
        let exact = "é".repeat(MAX_COMMENT_CHARS);
        assert!(validate(4, &exact).is_ok());
    }

    #[test]
    fn test_conflict_means_already_reviewed() {
        let err = ReviewError::from(RepositoryError::Conflict("review".to_string()));
        assert!(matches!(err, ReviewError::AlreadyReviewed));
    }
}
