//! Promo code repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tennis_shop_core::PromoCodeId;

use super::{RepositoryError, conflict_on_unique};
use crate::models::promo::PromoCode;

const PROMO_COLUMNS: &str = "id, code, discount_percent, valid_from, valid_to, is_active";

#[derive(Debug, sqlx::FromRow)]
struct PromoRow {
    id: PromoCodeId,
    code: String,
    discount_percent: i32,
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
    is_active: bool,
}

impl From<PromoRow> for PromoCode {
    fn from(row: PromoRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            discount_percent: row.discount_percent,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            is_active: row.is_active,
        }
    }
}

/// Repository for promo codes. Codes are stored upper-case.
pub struct PromoCodeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromoCodeRepository<'a> {
    /// Create a new promo code repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a code case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError> {
        let sql = format!("SELECT {PROMO_COLUMNS} FROM shop.promo_code WHERE code = upper($1)");
        let row = sqlx::query_as::<_, PromoRow>(&sql)
            .bind(code.trim())
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// All codes, newest validity window first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<PromoCode>, RepositoryError> {
        let sql = format!("SELECT {PROMO_COLUMNS} FROM shop.promo_code ORDER BY valid_from DESC, id DESC");
        let rows = sqlx::query_as::<_, PromoRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    pub async fn create(
        &self,
        code: &str,
        discount_percent: i32,
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
    ) -> Result<PromoCode, RepositoryError> {
        let sql = format!(
            "INSERT INTO shop.promo_code (code, discount_percent, valid_from, valid_to)
             VALUES (upper($1), $2, $3, $4)
             RETURNING {PROMO_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PromoRow>(&sql)
            .bind(code.trim())
            .bind(discount_percent)
            .bind(valid_from)
            .bind(valid_to)
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "promo code"))?;
        Ok(row.into())
    }

    /// Flip a code's active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn toggle_active(&self, id: PromoCodeId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE shop.promo_code SET is_active = NOT is_active WHERE id = $1")
                .bind(id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
