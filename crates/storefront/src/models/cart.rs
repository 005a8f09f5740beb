//! Cart line and summary models.

use rust_decimal::Decimal;
use serde::Serialize;

use tennis_shop_core::money::{self, Totals};
use tennis_shop_core::{CartId, CartItemId, ProductId, VariantId};

/// One cart line joined with the product data needed to display it.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_label: Option<String>,
    pub image_url: Option<String>,
    pub quantity: i32,
    /// Price snapshot taken when the line was first added.
    pub unit_price: Decimal,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        money::line_total(self.quantity, self.unit_price)
    }
}

/// Cart totals shown on the cart and checkout pages.
#[derive(Debug, Clone, Serialize, Default)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub item_count: i64,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl CartSummary {
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let item_count = lines.iter().map(|l| i64::from(l.quantity)).sum();
        let subtotal = lines.iter().map(CartLine::line_total).sum();
        let totals = Totals::compute(subtotal, 0);
        Self {
            lines,
            item_count,
            subtotal,
            tax: totals.tax,
            total: totals.total,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, quantity: i32, unit_price: i64) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            cart_id: CartId::new(1),
            product_id: ProductId::new(id),
            variant_id: None,
            product_name: format!("Product {id}"),
            variant_label: None,
            image_url: None,
            quantity,
            unit_price: Decimal::from(unit_price),
        }
    }

    #[test]
    fn summary_sums_quantity_times_unit_price() {
        let summary = CartSummary::from_lines(vec![line(1, 2, 150_000), line(2, 1, 700_000)]);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal, Decimal::from(1_000_000));
        assert_eq!(summary.tax, Decimal::from(100_000));
        assert_eq!(summary.total, Decimal::from(1_100_000));
    }

    #[test]
    fn empty_summary_is_zero() {
        let summary = CartSummary::from_lines(Vec::new());
        assert!(summary.is_empty());
        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.total, Decimal::ZERO);
    }
}
