//! Order, order item and payment models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tennis_shop_core::money;
use tennis_shop_core::{
    OrderId, OrderItemId, OrderStatus, PaymentId, PaymentMethod, PaymentStatus, ProductId,
    UserId, VariantId,
};

/// A placed order with its items and payment.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub phone: String,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub promo_code: Option<String>,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
}

impl Order {
    #[must_use]
    pub const fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id.as_i32() == user_id.as_i32()
    }

    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }

    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment
            .as_ref()
            .is_some_and(|p| p.status == PaymentStatus::Completed)
    }

    /// Whether the order page should offer "pay now" for a pending PayOS order.
    #[must_use]
    pub fn can_retry_payment(&self) -> bool {
        self.status.accepts_payment()
            && self
                .payment
                .as_ref()
                .is_some_and(|p| p.method == PaymentMethod::PayOs && p.status != PaymentStatus::Completed)
    }
}

/// Denormalized order line. Name and price are copied from the cart at checkout.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        money::line_total(self.quantity, self.price)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub amount: Decimal,
    /// `orderCode` sent to PayOS, used to match webhooks back to the payment.
    pub provider_order_code: Option<i64>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Order to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub phone: String,
    pub discount_percent: i32,
    pub promo_code: Option<String>,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

impl NewOrder {
    /// Sum of item price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(|i| money::line_total(i.quantity, i.price))
            .sum()
    }

    #[must_use]
    pub fn totals(&self) -> money::Totals {
        money::Totals::compute(self.subtotal(), self.discount_percent)
    }
}
