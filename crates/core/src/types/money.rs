//! Money arithmetic for carts, orders and payment links.
//!
//! Prices are Vietnamese dong held as [`Decimal`] with two fractional digits
//! in the database. Payment providers take whole dong, see [`to_vnd`].

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Sales tax applied at checkout (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Price of `quantity` units at `unit_price`.
#[must_use]
pub fn line_total(quantity: i32, unit_price: Decimal) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Tax owed on a (post-discount) subtotal, rounded to cents.
#[must_use]
pub fn tax(subtotal: Decimal) -> Decimal {
    (subtotal * TAX_RATE).round_dp(2)
}

/// Discount amount for `percent` off `subtotal`. Percent is clamped to 0..=100.
#[must_use]
pub fn discount(subtotal: Decimal, percent: i32) -> Decimal {
    let percent = Decimal::from(percent.clamp(0, 100));
    (subtotal * percent / Decimal::ONE_HUNDRED).round_dp(2)
}

/// Price after a percentage discount.
#[must_use]
pub fn apply_discount(price: Decimal, percent: i32) -> Decimal {
    price - discount(price, percent)
}

/// Order totals derived from an item subtotal and an optional discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// `total = subtotal - discount + tax(subtotal - discount)`.
    #[must_use]
    pub fn compute(subtotal: Decimal, discount_percent: i32) -> Self {
        let discount = discount(subtotal, discount_percent);
        let taxable = subtotal - discount;
        let tax = tax(taxable);
        Self {
            subtotal,
            discount,
            tax,
            total: taxable + tax,
        }
    }
}

/// Whole-dong amount for payment APIs. Fractions are truncated toward zero.
///
/// Returns `None` if the amount does not fit in an `i64`.
#[must_use]
pub fn to_vnd(amount: Decimal) -> Option<i64> {
    amount.trunc().to_i64()
}

/// Format an amount as `1,250,000 ₫`.
#[must_use]
pub fn format_vnd(amount: Decimal) -> String {
    let whole = amount.round().abs().to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount.is_sign_negative() && !amount.round().is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped} ₫")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn tax_is_ten_percent() {
        assert_eq!(tax(dec("1000000")), dec("100000"));
        assert_eq!(tax(dec("199.99")), dec("20.00"));
    }

    #[test]
    fn totals_apply_discount_before_tax() {
        let totals = Totals::compute(dec("2000000"), 10);
        assert_eq!(totals.discount, dec("200000"));
        assert_eq!(totals.tax, dec("180000"));
        assert_eq!(totals.total, dec("1980000"));
    }

    #[test]
    fn totals_without_discount() {
        let totals = Totals::compute(dec("500000"), 0);
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, dec("550000"));
    }

    #[test]
    fn discount_percent_is_clamped() {
        assert_eq!(discount(dec("100"), 150), dec("100"));
        assert_eq!(discount(dec("100"), -5), Decimal::ZERO);
        assert_eq!(apply_discount(dec("250000"), 20), dec("200000"));
    }

    #[test]
    fn line_total_multiplies() {
        assert_eq!(line_total(3, dec("1250000")), dec("3750000"));
    }

    #[test]
    fn to_vnd_truncates() {
        assert_eq!(to_vnd(dec("1100000.99")), Some(1_100_000));
        assert_eq!(to_vnd(dec("0")), Some(0));
    }

    #[test]
    fn format_vnd_groups_thousands() {
        assert_eq!(format_vnd(dec("1250000")), "1,250,000 ₫");
        assert_eq!(format_vnd(dec("999")), "999 ₫");
        assert_eq!(format_vnd(dec("1000.40")), "1,000 ₫");
        assert_eq!(format_vnd(dec("-5000")), "-5,000 ₫");
    }
}
