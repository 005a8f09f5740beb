//! Order service: creation rules, the status allow-list and owner guards.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use tennis_shop_core::{CartId, OrderId, OrderStatus, PaymentMethod, UserId};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::{NewOrder, Order};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    #[error("{0}")]
    InvalidOrder(&'static str),

    #[error("Order not found")]
    NotFound,

    #[error("You do not have access to this order")]
    Forbidden,

    #[error("Only pending orders can be cancelled.")]
    NotCancellable,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Order management for customers and admins.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Insert an order and its items in one transaction, optionally with a
    /// pending payment and clearing the cart it came from.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidOrder` if the order fails validation.
    pub async fn create(
        &self,
        order: &NewOrder,
        payment_method: Option<PaymentMethod>,
        clear_cart: Option<CartId>,
    ) -> Result<OrderId, OrderError> {
        validate(order)?;
        let id = self.orders.create(order, payment_method, clear_cart).await?;
        tracing::info!(order_id = %id, user_id = %order.user_id, "Order created");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no such order exists.
    pub async fn get(&self, id: OrderId) -> Result<Order, OrderError> {
        self.orders.get(id).await?.ok_or(OrderError::NotFound)
    }

    /// An order, only if `user_id` owns it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `OrderError::Forbidden`.
    pub async fn get_for_user(&self, user_id: UserId, id: OrderId) -> Result<Order, OrderError> {
        let order = self.get(id).await?;
        if !order.is_owned_by(user_id) {
            return Err(OrderError::Forbidden);
        }
        Ok(order)
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        if !user_id.is_valid() {
            return Ok(Vec::new());
        }
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// Every order, newest first (admin).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_all().await?)
    }

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn count(&self) -> Result<i64, OrderError> {
        Ok(self.orders.count().await?)
    }

    /// Sum of completed payments.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn revenue(&self) -> Result<Decimal, OrderError> {
        Ok(self.orders.revenue().await?)
    }

    /// Set a status from its name. Only the five known statuses are accepted.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidStatus` for names outside the allow-list
    /// and `OrderError::NotFound` if the order is missing.
    pub async fn update_status(&self, id: OrderId, status: &str) -> Result<OrderStatus, OrderError> {
        let status: OrderStatus = status
            .parse()
            .map_err(|_| OrderError::InvalidStatus(status.trim().to_string()))?;
        if !self.orders.update_status(id, status).await? {
            return Err(OrderError::NotFound);
        }
        tracing::info!(order_id = %id, status = %status, "Order status updated");
        Ok(status)
    }

    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if nothing was deleted.
    pub async fn delete(&self, id: OrderId) -> Result<(), OrderError> {
        if !self.orders.delete(id).await? {
            return Err(OrderError::NotFound);
        }
        tracing::info!(order_id = %id, "Order deleted");
        Ok(())
    }

    /// Cancel the user's own pending order, cancelling its payment too.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for someone else's order and
    /// `OrderError::NotCancellable` unless the order is pending.
    pub async fn cancel_for_user(&self, user_id: UserId, id: OrderId) -> Result<(), OrderError> {
        let order = self.get_for_user(user_id, id).await?;
        if !order.status.is_cancellable() {
            return Err(OrderError::NotCancellable);
        }
        // The status may have moved on since the read
        if !self.orders.cancel_pending(id).await? {
            return Err(OrderError::NotCancellable);
        }
        tracing::info!(order_id = %id, user_id = %user_id, "Order cancelled by customer");
        Ok(())
    }
}

/// Structural checks on a new order.
///
/// # Errors
///
/// Returns `OrderError::InvalidOrder` naming the first failing rule.
pub fn validate(order: &NewOrder) -> Result<(), OrderError> {
    if !order.user_id.is_valid() {
        return Err(OrderError::InvalidOrder("Invalid user ID"));
    }
    if order.items.is_empty() {
        return Err(OrderError::InvalidOrder("Order must contain at least one item"));
    }
    if order.shipping_address.trim().is_empty() || order.phone.trim().is_empty() {
        return Err(OrderError::InvalidOrder(
            "Shipping address and phone are required.",
        ));
    }
    for item in &order.items {
        if !item.product_id.is_valid() {
            return Err(OrderError::InvalidOrder("Invalid product ID"));
        }
        if item.quantity <= 0 {
            return Err(OrderError::InvalidOrder("Quantity must be greater than 0"));
        }
        if item.price < Decimal::ZERO {
            return Err(OrderError::InvalidOrder("Price cannot be negative"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tennis_shop_core::ProductId;

    use super::*;
    use crate::models::NewOrderItem;

    fn order() -> NewOrder {
        NewOrder {
            user_id: UserId::new(2),
            status: OrderStatus::Pending,
            shipping_address: "5 Nguyen Hue".to_string(),
            phone: "0912345678".to_string(),
            discount_percent: 0,
            promo_code: None,
            items: vec![NewOrderItem {
                product_id: ProductId::new(1),
                variant_id: None,
                product_name: "Overgrip 3-pack".to_string(),
                quantity: 2,
                price: Decimal::from(120_000),
            }],
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_order() {
        assert!(validate(&order()).is_ok());
    }

    #[test]
    fn test_validate_rejects_each_rule() {
        let mut o = order();
        o.user_id = UserId::new(0);
        assert!(matches!(validate(&o), Err(OrderError::InvalidOrder("Invalid user ID"))));

        let mut o = order();
        o.items.clear();
        assert!(validate(&o).is_err());

        let mut o = order();
        o.phone = "  ".to_string();
        assert!(matches!(
            validate(&o),
            Err(OrderError::InvalidOrder("Shipping address and phone are required."))
        ));

        let mut o = order();
        if let Some(item) = o.items.first_mut() {
            item.quantity = 0;
        }
        assert!(validate(&o).is_err());

        let mut o = order();
        if let Some(item) = o.items.first_mut() {
            item.price = Decimal::from(-1);
        }
        assert!(validate(&o).is_err());
    }

    #[test]
    fn test_totals_include_discount_and_tax() {
        let mut o = order();
        o.discount_percent = 10;
        let totals = o.totals();
        assert_eq!(totals.subtotal, Decimal::from(240_000));
        assert_eq!(totals.discount, Decimal::from(24_000));
        assert_eq!(totals.tax, Decimal::from(21_600));
        assert_eq!(totals.total, Decimal::from(237_600));
    }
}
