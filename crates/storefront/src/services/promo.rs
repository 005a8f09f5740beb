//! Promo code administration.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use thiserror::Error;

use tennis_shop_core::PromoCodeId;

use crate::db::{PromoCodeRepository, RepositoryError};
use crate::models::PromoCode;

const MAX_CODE_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum PromoError {
    #[error("{0}")]
    Invalid(&'static str),

    #[error("promo code already exists")]
    Duplicate,

    #[error("promo code not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for PromoError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(_) => Self::Duplicate,
            other => Self::Repository(other),
        }
    }
}

/// Admin form for a new code. Dates are whole days in UTC.
#[derive(Debug, Clone)]
pub struct NewPromoCode {
    pub code: String,
    pub discount_percent: i32,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
}

/// Validated code with its validity window expanded to instants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoWindow {
    pub code: String,
    pub discount_percent: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

/// Normalize and check a new code. `valid_to` covers the whole final day.
///
/// # Errors
///
/// Returns `PromoError::Invalid` naming the first failing rule.
pub fn validate(form: &NewPromoCode) -> Result<PromoWindow, PromoError> {
    let code = form.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(PromoError::Invalid("Code is required."));
    }
    if code.chars().count() > MAX_CODE_CHARS
        || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(PromoError::Invalid(
            "Codes use letters, digits, dashes and underscores.",
        ));
    }
    if !(1..=100).contains(&form.discount_percent) {
        return Err(PromoError::Invalid("Discount must be between 1 and 100 percent."));
    }
    if form.valid_to < form.valid_from {
        return Err(PromoError::Invalid("The end date must not be before the start date."));
    }

    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    Ok(PromoWindow {
        code,
        discount_percent: form.discount_percent,
        valid_from: form.valid_from.and_time(NaiveTime::MIN).and_utc(),
        valid_to: form.valid_to.and_time(end_of_day).and_utc(),
    })
}

pub struct PromoCodeService<'a> {
    promos: PromoCodeRepository<'a>,
}

impl<'a> PromoCodeService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            promos: PromoCodeRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `PromoError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<PromoCode>, PromoError> {
        Ok(self.promos.list().await?)
    }

    /// # Errors
    ///
    /// Returns `PromoError::Invalid` for bad input and `PromoError::Duplicate`
    /// if the code is taken.
    pub async fn create(&self, form: &NewPromoCode) -> Result<PromoCode, PromoError> {
        let window = validate(form)?;
        let promo = self
            .promos
            .create(
                &window.code,
                window.discount_percent,
                window.valid_from,
                window.valid_to,
            )
            .await?;
        tracing::info!(promo_id = %promo.id, code = %promo.code, "Promo code created");
        Ok(promo)
    }

    /// # Errors
    ///
    /// Returns `PromoError::NotFound` if the code does not exist.
    pub async fn toggle(&self, id: PromoCodeId) -> Result<(), PromoError> {
        if !self.promos.toggle_active(id).await? {
            return Err(PromoError::NotFound);
        }
        tracing::info!(promo_id = %id, "Promo code toggled");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(code: &str, percent: i32, from: (i32, u32, u32), to: (i32, u32, u32)) -> NewPromoCode {
        NewPromoCode {
            code: code.to_string(),
            discount_percent: percent,
            valid_from: NaiveDate::from_ymd_opt(from.0, from.1, from.2).unwrap(),
            valid_to: NaiveDate::from_ymd_opt(to.0, to.1, to.2).unwrap(),
        }
    }

    #[test]
    fn codes_are_upper_cased_and_cover_the_last_day() {
        let window = validate(&form(" summer10 ", 10, (2025, 6, 1), (2025, 6, 30))).unwrap();
        assert_eq!(window.code, "SUMMER10");
        assert_eq!(window.valid_from.to_rfc3339(), "2025-06-01T00:00:00+00:00");
        assert_eq!(window.valid_to.to_rfc3339(), "2025-06-30T23:59:59+00:00");
    }

    #[test]
    fn single_day_codes_are_allowed() {
        assert!(validate(&form("ACE", 5, (2025, 6, 1), (2025, 6, 1))).is_ok());
    }

    #[test]
    fn rejects_bad_codes_percentages_and_windows() {
        assert!(matches!(
            validate(&form("  ", 10, (2025, 6, 1), (2025, 6, 2))),
            Err(PromoError::Invalid(_))
        ));
        assert!(matches!(
            validate(&form("NO SPACES", 10, (2025, 6, 1), (2025, 6, 2))),
            Err(PromoError::Invalid(_))
        ));
        assert!(matches!(
            validate(&form("ZERO", 0, (2025, 6, 1), (2025, 6, 2))),
            Err(PromoError::Invalid(_))
        ));
        assert!(matches!(
            validate(&form("BACKWARDS", 10, (2025, 6, 2), (2025, 6, 1))),
            Err(PromoError::Invalid(_))
        ));
    }
}
