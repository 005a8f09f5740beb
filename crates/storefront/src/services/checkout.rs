//! Checkout and payment flow.
//!
//! Placing an order snapshots the cart into an order with a pending payment
//! and empties the cart, all in one transaction. PayOS orders are then sent
//! to the payment page; the order is marked paid either when the buyer
//! returns to `/payment/success/{id}` or when the signed webhook arrives,
//! whichever comes first.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;

use tennis_shop_core::{OrderId, OrderStatus, PaymentMethod, UserId};

use super::orders::{OrderError, OrderService};
use crate::db::{CartRepository, OrderRepository, PromoCodeRepository, RepositoryError};
use crate::models::{CartLine, CartSummary, NewOrder, NewOrderItem, Order, PromoCode};
use crate::payos::types::{SUCCESS_CODE, WebhookPayload};
use crate::payos::{PayOsClient, PayOsError};

/// Errors from checkout and payment handling.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty.")]
    EmptyCart,

    #[error("Shipping address and phone are required.")]
    MissingShipping,

    #[error("Promo code is invalid or has expired.")]
    InvalidPromoCode,

    #[error("Can only retry payment for pending orders.")]
    NotPending,

    #[error("invalid webhook signature")]
    BadSignature,

    #[error("payment link failed: {0}")]
    PaymentLink(#[from] PayOsError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Where the buyer goes after placing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacedOrder {
    /// Cash on delivery: show the order.
    Placed(OrderId),
    /// Send the buyer to the PayOS checkout page.
    Redirect { order_id: OrderId, checkout_url: String },
    /// The order exists but no payment link could be created.
    PaymentLinkFailed(OrderId),
}

/// What a verified webhook did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Paid(OrderId),
    AlreadyProcessed(OrderId),
    /// Not a successful payment notification.
    Ignored,
    /// No payment was issued with this order code.
    UnknownOrder(i64),
}

/// Checkout summary: cart lines plus totals, with an optional promo applied.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub cart: CartSummary,
}

/// Checkout form after extraction.
#[derive(Debug, Clone)]
pub struct CheckoutForm {
    pub shipping_address: String,
    pub phone: String,
    pub payment_method: PaymentMethod,
    pub promo_code: Option<String>,
}

impl CheckoutForm {
    /// Trimmed shipping address and phone, both required.
    fn shipping(&self) -> Result<(&str, &str), CheckoutError> {
        let address = self.shipping_address.trim();
        let phone = self.phone.trim();
        if address.is_empty() || phone.is_empty() {
            return Err(CheckoutError::MissingShipping);
        }
        Ok((address, phone))
    }
}

/// Snapshot a cart line into an order line. The variant label is folded into
/// the name so the order reads correctly after the variant changes.
fn order_item(line: CartLine) -> NewOrderItem {
    let product_name = match &line.variant_label {
        Some(label) => format!("{} ({label})", line.product_name),
        None => line.product_name,
    };
    NewOrderItem {
        product_id: line.product_id,
        variant_id: line.variant_id,
        product_name,
        quantity: line.quantity,
        price: line.unit_price,
    }
}

pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    payos: &'a PayOsClient,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, payos: &'a PayOsClient) -> Self {
        Self { pool, payos }
    }

    /// The cart as it will be ordered.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing to buy.
    pub async fn summary(&self, user_id: UserId) -> Result<CheckoutSummary, CheckoutError> {
        let carts = CartRepository::new(self.pool);
        let lines = match carts.find_for_user(user_id).await? {
            Some(cart_id) => carts.lines(cart_id).await?,
            None => Vec::new(),
        };
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        Ok(CheckoutSummary {
            cart: CartSummary::from_lines(lines),
        })
    }

    /// Turn the user's cart into an order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingShipping`, `CheckoutError::EmptyCart`
    /// or `CheckoutError::InvalidPromoCode` before anything is written. A
    /// PayOS failure after the order is saved is reported as
    /// [`PlacedOrder::PaymentLinkFailed`], not as an error.
    pub async fn place_order(
        &self,
        user_id: UserId,
        form: &CheckoutForm,
    ) -> Result<PlacedOrder, CheckoutError> {
        let (shipping_address, phone) = form.shipping()?;

        let carts = CartRepository::new(self.pool);
        let cart_id = carts
            .find_for_user(user_id)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;
        let lines = carts.lines(cart_id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let promo = match form.promo_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Some(self.redeemable_promo(code).await?),
            _ => None,
        };

        let order = NewOrder {
            user_id,
            status: OrderStatus::Pending,
            shipping_address: shipping_address.to_string(),
            phone: phone.to_string(),
            discount_percent: promo.as_ref().map_or(0, |p| p.discount_percent),
            promo_code: promo.map(|p| p.code),
            items: lines.into_iter().map(order_item).collect(),
        };

        let order_id = OrderService::new(self.pool)
            .create(&order, Some(form.payment_method), Some(cart_id))
            .await?;

        match form.payment_method {
            PaymentMethod::Cod => Ok(PlacedOrder::Placed(order_id)),
            PaymentMethod::PayOs => match self.issue_payment_link(order_id).await {
                Ok(checkout_url) => Ok(PlacedOrder::Redirect {
                    order_id,
                    checkout_url,
                }),
                Err(e) => {
                    tracing::error!(order_id = %order_id, error = %e, "Failed to create PayOS payment link");
                    Ok(PlacedOrder::PaymentLinkFailed(order_id))
                }
            },
        }
    }

    /// Buyer returned from PayOS. Marks a pending PayOS order paid; repeat
    /// visits and already-processed orders are left alone.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound`/`Forbidden` (wrapped) for orders the
    /// user cannot see.
    pub async fn payment_success(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, CheckoutError> {
        let orders = OrderService::new(self.pool);
        let order = orders.get_for_user(user_id, order_id).await?;

        let pays_online = order
            .payment
            .as_ref()
            .is_some_and(|p| p.method == PaymentMethod::PayOs);
        if order.status.accepts_payment()
            && pays_online
            && OrderRepository::new(self.pool).mark_paid(order_id).await?
        {
            tracing::info!(order_id = %order_id, "Order paid via PayOS return");
            return Ok(orders.get(order_id).await?);
        }
        Ok(order)
    }

    /// Buyer cancelled on the PayOS page. The order stays pending.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound`/`Forbidden` (wrapped).
    pub async fn payment_cancel(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, CheckoutError> {
        Ok(OrderService::new(self.pool)
            .get_for_user(user_id, order_id)
            .await?)
    }

    /// Issue a fresh payment link for the user's pending order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotPending` unless the order is pending and
    /// `CheckoutError::PaymentLink` if PayOS fails.
    pub async fn retry_payment(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<String, CheckoutError> {
        let order = OrderService::new(self.pool)
            .get_for_user(user_id, order_id)
            .await?;
        if !order.status.accepts_payment() {
            return Err(CheckoutError::NotPending);
        }
        self.issue_payment_link(order_id).await
    }

    /// Apply a PayOS webhook.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::BadSignature` if the signature does not match.
    pub async fn handle_webhook(
        &self,
        payload: &WebhookPayload,
    ) -> Result<WebhookOutcome, CheckoutError> {
        if !self.payos.verify_signature(&payload.data, &payload.signature) {
            tracing::warn!("PayOS webhook signature mismatch");
            return Err(CheckoutError::BadSignature);
        }

        if payload.payment_code() != SUCCESS_CODE {
            tracing::info!(code = payload.payment_code(), "PayOS webhook is not a success notification");
            return Ok(WebhookOutcome::Ignored);
        }
        let Some(order_code) = payload.order_code() else {
            tracing::warn!("PayOS webhook has no orderCode");
            return Ok(WebhookOutcome::Ignored);
        };

        let orders = OrderRepository::new(self.pool);
        let Some(payment) = orders.find_payment_by_order_code(order_code).await? else {
            tracing::warn!(order_code, "PayOS webhook for unknown order code");
            return Ok(WebhookOutcome::UnknownOrder(order_code));
        };

        if orders.mark_paid(payment.order_id).await? {
            tracing::info!(order_id = %payment.order_id, order_code, "Order paid via PayOS webhook");
            Ok(WebhookOutcome::Paid(payment.order_id))
        } else {
            Ok(WebhookOutcome::AlreadyProcessed(payment.order_id))
        }
    }

    async fn redeemable_promo(&self, code: &str) -> Result<PromoCode, CheckoutError> {
        PromoCodeRepository::new(self.pool)
            .find_by_code(code)
            .await?
            .filter(|p| p.is_redeemable_at(Utc::now()))
            .ok_or(CheckoutError::InvalidPromoCode)
    }

    async fn issue_payment_link(&self, order_id: OrderId) -> Result<String, CheckoutError> {
        let order = OrderService::new(self.pool).get(order_id).await?;
        let payment = order
            .payment
            .as_ref()
            .ok_or(RepositoryError::NotFound)?;

        let link = self.payos.create_payment_link(&order).await?;
        OrderRepository::new(self.pool)
            .record_order_code(payment.id, link.order_code)
            .await?;
        Ok(link.checkout_url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::{Map, Value, json};
    use sqlx::postgres::PgPoolOptions;

    use tennis_shop_core::{CartId, CartItemId, PaymentStatus, ProductId, VariantId};

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::payos::{canonical_data, sign};
    use crate::services::CartService;
    use crate::services::promo::{NewPromoCode, PromoCodeService};
    use crate::test_support;

    fn form(address: &str, phone: &str) -> CheckoutForm {
        CheckoutForm {
            shipping_address: address.to_string(),
            phone: phone.to_string(),
            payment_method: PaymentMethod::Cod,
            promo_code: None,
        }
    }

    fn line(variant_label: Option<&str>) -> CartLine {
        CartLine {
            id: CartItemId::new(1),
            cart_id: CartId::new(1),
            product_id: ProductId::new(7),
            variant_id: variant_label.map(|_| VariantId::new(3)),
            product_name: "Pure Aero".to_string(),
            variant_label: variant_label.map(str::to_string),
            image_url: None,
            quantity: 2,
            unit_price: Decimal::from(4_000_000),
        }
    }

    fn payload(data: Value, checksum_key: &str) -> WebhookPayload {
        let data: Map<String, Value> = data.as_object().cloned().unwrap();
        let signature = sign(checksum_key, &canonical_data(&data));
        WebhookPayload {
            code: "00".to_string(),
            desc: "success".to_string(),
            success: true,
            data,
            signature,
        }
    }

    #[test]
    fn shipping_fields_are_trimmed_and_required() {
        let f = form("  12 Le Loi  ", " 0900000000 ");
        assert_eq!(f.shipping().unwrap(), ("12 Le Loi", "0900000000"));

        assert!(matches!(form("   ", "0900000000").shipping(), Err(CheckoutError::MissingShipping)));
        assert!(matches!(form("12 Le Loi", "").shipping(), Err(CheckoutError::MissingShipping)));
    }

    #[test]
    fn order_items_keep_price_snapshot_and_variant_label() {
        let item = order_item(line(Some("G2")));
        assert_eq!(item.product_name, "Pure Aero (G2)");
        assert_eq!(item.price, Decimal::from(4_000_000));
        assert_eq!(item.quantity, 2);
        assert_eq!(item.variant_id, Some(VariantId::new(3)));

        assert_eq!(order_item(line(None)).product_name, "Pure Aero");
    }

    #[tokio::test]
    async fn webhook_signature_is_checked_before_anything_else() {
        let config = StorefrontConfig::for_tests();
        let payos = PayOsClient::new(&config.payos, &config.base_url).unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/tennis_shop_test")
            .unwrap();
        let service = CheckoutService::new(&pool, &payos);

        let mut forged = payload(json!({ "orderCode": 17, "code": "00" }), "wrong-key");
        let result = service.handle_webhook(&forged).await;
        assert!(matches!(result, Err(CheckoutError::BadSignature)));

        forged.signature = String::new();
        assert!(matches!(
            service.handle_webhook(&forged).await,
            Err(CheckoutError::BadSignature)
        ));
    }

    #[tokio::test]
    async fn failed_payment_notifications_are_ignored() {
        let config = StorefrontConfig::for_tests();
        let payos = PayOsClient::new(&config.payos, &config.base_url).unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/tennis_shop_test")
            .unwrap();
        let service = CheckoutService::new(&pool, &payos);

        let key = secrecy::ExposeSecret::expose_secret(&config.payos.checksum_key).to_string();
        let failed = payload(json!({ "orderCode": 17, "code": "01", "desc": "failed" }), &key);
        assert_eq!(service.handle_webhook(&failed).await.unwrap(), WebhookOutcome::Ignored);
    }

    fn checkout(payment_method: PaymentMethod, promo_code: Option<String>) -> CheckoutForm {
        CheckoutForm {
            payment_method,
            promo_code,
            ..form("12 Le Loi", "0900000000")
        }
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    async fn signed_webhook_pays_a_retried_order_once() {
        let pool = test_support::pool().await;
        let user = test_support::customer(&pool).await;
        let product_id = test_support::product(&pool, 2_000_000, 5).await;
        CartService::new(&pool).add_item(user, product_id, 1, None).await.unwrap();

        let mut config = StorefrontConfig::for_tests();
        config.payos.api_url = "http://127.0.0.1:9".to_string();
        let payos = PayOsClient::new(&config.payos, &config.base_url).unwrap();
        let service = CheckoutService::new(&pool, &payos);

        let placed = service
            .place_order(user, &checkout(PaymentMethod::PayOs, None))
            .await
            .unwrap();
        let PlacedOrder::PaymentLinkFailed(order_id) = placed else {
            panic!("expected the unreachable PayOS API to fail, got {placed:?}");
        };

        // Two links issued: the buyer pays on the first one
        let orders = OrderRepository::new(&pool);
        let payment_id = orders.get(order_id).await.unwrap().unwrap().payment.unwrap().id;
        let first = test_support::order_code();
        let second = first + 1;
        orders.record_order_code(payment_id, first).await.unwrap();
        orders.record_order_code(payment_id, second).await.unwrap();
        assert!(matches!(
            orders.record_order_code(payment_id, first).await,
            Err(RepositoryError::Conflict(_))
        ));

        let key = secrecy::ExposeSecret::expose_secret(&config.payos.checksum_key).to_string();
        let webhook = payload(
            json!({ "orderCode": first, "amount": 2_200_000, "code": "00", "desc": "success" }),
            &key,
        );
        assert_eq!(
            service.handle_webhook(&webhook).await.unwrap(),
            WebhookOutcome::Paid(order_id)
        );
        assert_eq!(
            service.handle_webhook(&webhook).await.unwrap(),
            WebhookOutcome::AlreadyProcessed(order_id)
        );

        let order = orders.get(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        let payment = order.payment.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.provider_order_code, Some(second));

        let unknown = payload(json!({ "orderCode": second + 1, "code": "00" }), &key);
        assert_eq!(
            service.handle_webhook(&unknown).await.unwrap(),
            WebhookOutcome::UnknownOrder(second + 1)
        );
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    async fn valid_promo_code_lowers_the_order_total() {
        let pool = test_support::pool().await;
        let user = test_support::customer(&pool).await;
        let product_id = test_support::product(&pool, 1_000_000, 5).await;
        CartService::new(&pool).add_item(user, product_id, 2, None).await.unwrap();

        let today = Utc::now().date_naive();
        let promo = PromoCodeService::new(&pool)
            .create(&NewPromoCode {
                code: format!("ACE{}", test_support::unique()),
                discount_percent: 10,
                valid_from: today - chrono::Days::new(1),
                valid_to: today + chrono::Days::new(1),
            })
            .await
            .unwrap();

        let config = StorefrontConfig::for_tests();
        let payos = PayOsClient::new(&config.payos, &config.base_url).unwrap();
        let service = CheckoutService::new(&pool, &payos);
        let placed = service
            .place_order(
                user,
                &checkout(PaymentMethod::Cod, Some(promo.code.to_lowercase())),
            )
            .await
            .unwrap();
        let PlacedOrder::Placed(order_id) = placed else {
            panic!("cash on delivery should place the order, got {placed:?}");
        };

        let order = OrderRepository::new(&pool).get(order_id).await.unwrap().unwrap();
        assert_eq!(order.subtotal, Decimal::from(2_000_000));
        assert_eq!(order.discount_amount, Decimal::from(200_000));
        assert_eq!(order.tax_amount, Decimal::from(180_000));
        assert_eq!(order.total_amount, Decimal::from(1_980_000));
        assert!(order.total_amount < order.subtotal + tennis_shop_core::money::tax(order.subtotal));
        assert_eq!(order.promo_code.as_deref(), Some(promo.code.as_str()));
    }
}
