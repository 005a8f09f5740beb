//! Order repository: orders, their items and payments.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use tennis_shop_core::{
    CartId, OrderId, OrderItemId, OrderStatus, PaymentId, PaymentMethod, PaymentStatus, ProductId,
    UserId, VariantId,
};

use super::{RepositoryError, conflict_on_unique};
use crate::models::order::{NewOrder, Order, OrderItem, Payment};

const ORDER_SELECT: &str = "SELECT o.id, o.user_id, u.full_name AS customer_name, \
     u.email AS customer_email, o.order_date, o.status, o.shipping_address, o.phone, \
     o.subtotal, o.discount_amount, o.tax_amount, o.total_amount, o.promo_code \
     FROM shop.shop_order o JOIN shop.app_user u ON u.id = o.user_id";

const PAYMENT_COLUMNS: &str =
    "id, order_id, payment_method, payment_status, amount, provider_order_code, paid_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    customer_name: String,
    customer_email: String,
    order_date: DateTime<Utc>,
    status: String,
    shipping_address: String,
    phone: String,
    subtotal: Decimal,
    discount_amount: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    promo_code: Option<String>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<OrderStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            order_date: row.order_date,
            status,
            shipping_address: row.shipping_address,
            phone: row.phone,
            subtotal: row.subtotal,
            discount_amount: row.discount_amount,
            tax_amount: row.tax_amount,
            total_amount: row.total_amount,
            promo_code: row.promo_code,
            items: Vec::new(),
            payment: None,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    product_name: String,
    quantity: i32,
    price: Decimal,
}

impl From<ItemRow> for OrderItem {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            product_name: row.product_name,
            quantity: row.quantity,
            price: row.price,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: PaymentId,
    order_id: OrderId,
    payment_method: String,
    payment_status: String,
    amount: Decimal,
    provider_order_code: Option<i64>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RepositoryError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let corrupt = |e: tennis_shop_core::InvalidStatus| {
            RepositoryError::DataCorruption(format!("payment {}: {e}", row.id))
        };
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            method: row.payment_method.parse::<PaymentMethod>().map_err(corrupt)?,
            status: row.payment_status.parse::<PaymentStatus>().map_err(corrupt)?,
            amount: row.amount,
            provider_order_code: row.provider_order_code,
            paid_at: row.paid_at,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order with its items in one transaction.
    ///
    /// When `payment_method` is set a pending payment for the order total is
    /// created too. When `clear_cart` is set that cart is emptied in the same
    /// transaction, so a failed checkout leaves the cart intact.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is written.
    pub async fn create(
        &self,
        order: &NewOrder,
        payment_method: Option<PaymentMethod>,
        clear_cart: Option<CartId>,
    ) -> Result<OrderId, RepositoryError> {
        let totals = order.totals();
        let mut tx = self.pool.begin().await?;

        let order_id = sqlx::query_scalar::<_, OrderId>(
            "INSERT INTO shop.shop_order
                 (user_id, status, shipping_address, phone, subtotal,
                  discount_amount, tax_amount, total_amount, promo_code)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(order.user_id)
        .bind(order.status.as_str())
        .bind(&order.shipping_address)
        .bind(&order.phone)
        .bind(totals.subtotal)
        .bind(totals.discount)
        .bind(totals.tax)
        .bind(totals.total)
        .bind(order.promo_code.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO shop.order_item
                     (order_id, product_id, variant_id, product_name, quantity, price)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(method) = payment_method {
            sqlx::query(
                "INSERT INTO shop.payment (order_id, payment_method, payment_status, amount)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(method.as_str())
            .bind(PaymentStatus::Pending.as_str())
            .bind(totals.total)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(cart_id) = clear_cart {
            sqlx::query("DELETE FROM shop.cart_item WHERE cart_id = $1")
                .bind(cart_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(order_id)
    }

    /// Get an order with items and payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is unknown.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut orders = vec![Order::try_from(row)?];
        self.attach_children(&mut orders).await?;
        Ok(orders.pop())
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.order_date DESC, o.id DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;
        self.hydrate(rows).await
    }

    /// Every order, newest first (admin).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} ORDER BY o.order_date DESC, o.id DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        self.hydrate(rows).await
    }

    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Order>, _>>()?;
        self.attach_children(&mut orders).await?;
        Ok(orders)
    }

    async fn attach_children(&self, orders: &mut [Order]) -> Result<(), RepositoryError> {
        if orders.is_empty() {
            return Ok(());
        }
        let ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();

        let items = sqlx::query_as::<_, ItemRow>(
            "SELECT id, order_id, product_id, variant_id, product_name, quantity, price
             FROM shop.order_item WHERE order_id = ANY($1) ORDER BY order_id, id",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        // Latest payment per order wins if an order was ever paid twice.
        let sql = format!(
            "SELECT DISTINCT ON (order_id) {PAYMENT_COLUMNS}
             FROM shop.payment WHERE order_id = ANY($1)
             ORDER BY order_id, id DESC"
        );
        let payments = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(&ids)
            .fetch_all(self.pool)
            .await?;

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in items {
            items_by_order.entry(row.order_id).or_default().push(row.into());
        }
        let mut payment_by_order: HashMap<OrderId, Payment> = HashMap::new();
        for row in payments {
            let payment = Payment::try_from(row)?;
            payment_by_order.insert(payment.order_id, payment);
        }

        for order in orders.iter_mut() {
            order.items = items_by_order.remove(&order.id).unwrap_or_default();
            order.payment = payment_by_order.remove(&order.id);
        }
        Ok(())
    }

    /// Count all orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM shop.shop_order")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Sum of completed payments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue(&self) -> Result<Decimal, RepositoryError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM shop.payment WHERE payment_status = $1",
        )
        .bind(PaymentStatus::Completed.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(total)
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE shop.shop_order SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an order. Items and payments cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.shop_order WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark an order paid: a pending order moves to processing and its
    /// payment to completed. Returns false if the order was not pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn mark_paid(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE shop.shop_order SET status = $2 WHERE id = $1 AND status = $3",
        )
        .bind(id)
        .bind(OrderStatus::Processing.as_str())
        .bind(OrderStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if updated {
            sqlx::query(
                "UPDATE shop.payment SET payment_status = $2, paid_at = now()
                 WHERE order_id = $1 AND payment_status <> $2",
            )
            .bind(id)
            .bind(PaymentStatus::Completed.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Cancel a pending order and its payment. Returns false if it was not pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn cancel_pending(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE shop.shop_order SET status = $2 WHERE id = $1 AND status = $3",
        )
        .bind(id)
        .bind(OrderStatus::Cancelled.as_str())
        .bind(OrderStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if updated {
            sqlx::query("UPDATE shop.payment SET payment_status = $2 WHERE order_id = $1")
                .bind(id)
                .bind(PaymentStatus::Cancelled.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Record a PayOS `orderCode` issued for a payment. The payment keeps the
    /// latest code; earlier codes stay resolvable through
    /// [`find_payment_by_order_code`](Self::find_payment_by_order_code).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code was already issued.
    pub async fn record_order_code(
        &self,
        payment_id: PaymentId,
        order_code: i64,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO shop.payment_link (order_code, payment_id) VALUES ($1, $2)")
            .bind(order_code)
            .bind(payment_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "payment order code"))?;

        sqlx::query("UPDATE shop.payment SET provider_order_code = $2 WHERE id = $1")
            .bind(payment_id)
            .bind(order_code)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Find the payment a PayOS `orderCode` was issued for, whether it is the
    /// latest code or one issued before a retry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_payment_by_order_code(
        &self,
        order_code: i64,
    ) -> Result<Option<Payment>, RepositoryError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM shop.payment
             WHERE id = (SELECT payment_id FROM shop.payment_link WHERE order_code = $1)"
        );
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(order_code)
            .fetch_optional(self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }
}
