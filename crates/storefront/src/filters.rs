//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use rust_decimal::Decimal;

use tennis_shop_core::money;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an amount in dong: `{{ product.base_price|vnd }}` gives `1,250,000 ₫`.
#[askama::filter_fn]
pub fn vnd(amount: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let text = amount.to_string();
    Ok(text
        .parse::<Decimal>()
        .map_or(text, money::format_vnd))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use tennis_shop_core::money;

    #[test]
    fn test_decimal_display_parses_back() {
        let amount = Decimal::new(125_000_000, 2);
        let text = amount.to_string();
        assert_eq!(text.parse::<Decimal>().ok().map(money::format_vnd).as_deref(), Some("1,250,000 ₫"));
    }
}
