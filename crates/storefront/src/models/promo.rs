//! Promotional discount codes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tennis_shop_core::PromoCodeId;

#[derive(Debug, Clone, Serialize)]
pub struct PromoCode {
    pub id: PromoCodeId,
    pub code: String,
    pub discount_percent: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_active: bool,
}

impl PromoCode {
    /// Active and `valid_from <= at <= valid_to`.
    #[must_use]
    pub fn is_redeemable_at(&self, at: DateTime<Utc>) -> bool {
        self.is_active && self.valid_from <= at && at <= self.valid_to
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn promo(active: bool, from_days: i64, to_days: i64) -> PromoCode {
        let now = Utc::now();
        PromoCode {
            id: PromoCodeId::new(1),
            code: "ACE10".to_string(),
            discount_percent: 10,
            valid_from: now + Duration::days(from_days),
            valid_to: now + Duration::days(to_days),
            is_active: active,
        }
    }

    #[test]
    fn redeemable_inside_window() {
        assert!(promo(true, -1, 1).is_redeemable_at(Utc::now()));
    }

    #[test]
    fn not_redeemable_when_inactive_or_outside_window() {
        assert!(!promo(false, -1, 1).is_redeemable_at(Utc::now()));
        assert!(!promo(true, 1, 2).is_redeemable_at(Utc::now()));
        assert!(!promo(true, -3, -1).is_redeemable_at(Utc::now()));
    }
}
