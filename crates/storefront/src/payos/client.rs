//! PayOS API client.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use tennis_shop_core::{OrderId, money};

use crate::config::PayOsConfig;
use crate::models::Order;

use super::error::PayOsError;
use super::signature;
use super::types::{
    ApiResponse, PaymentItem, PaymentLink, PaymentLinkData, PaymentRequest, SUCCESS_CODE,
};

/// PayOS rejects descriptions longer than this.
const MAX_DESCRIPTION_CHARS: usize = 25;

/// PayOS merchant API client.
#[derive(Clone)]
pub struct PayOsClient {
    inner: Arc<PayOsClientInner>,
}

struct PayOsClientInner {
    client: reqwest::Client,
    endpoint: String,
    client_id: String,
    api_key: SecretString,
    checksum_key: SecretString,
    base_url: String,
}

impl PayOsClient {
    /// Create a new PayOS client.
    ///
    /// `base_url` is the public storefront URL used for the return and
    /// cancel links.
    ///
    /// # Errors
    ///
    /// Returns `PayOsError::Http` if the HTTP client cannot be built.
    pub fn new(config: &PayOsConfig, base_url: &str) -> Result<Self, PayOsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            inner: Arc::new(PayOsClientInner {
                client,
                endpoint: format!("{}/v2/payment-requests", config.api_url.trim_end_matches('/')),
                client_id: config.client_id.clone(),
                api_key: config.api_key.clone(),
                checksum_key: config.checksum_key.clone(),
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Sign `data` with the merchant checksum key.
    #[must_use]
    pub fn sign(&self, data: &str) -> String {
        signature::sign(self.inner.checksum_key.expose_secret(), data)
    }

    /// Verify a webhook `data` object against its signature.
    #[must_use]
    pub fn verify_signature(
        &self,
        data: &serde_json::Map<String, serde_json::Value>,
        signature: &str,
    ) -> bool {
        signature::verify_signature(self.inner.checksum_key.expose_secret(), data, signature)
    }

    /// Build the signed payment request for an order without sending it.
    ///
    /// # Errors
    ///
    /// Returns `PayOsError::InvalidOrder` if the order has no items, a
    /// non-positive total, or an amount PayOS cannot represent.
    pub fn build_request(&self, order: &Order, now_secs: i64) -> Result<PaymentRequest, PayOsError> {
        if order.items.is_empty() {
            return Err(PayOsError::InvalidOrder("order has no items".to_string()));
        }
        if order.total_amount <= rust_decimal::Decimal::ZERO {
            return Err(PayOsError::InvalidOrder("order total must be positive".to_string()));
        }

        let order_code = order_code_for(order.id, now_secs)?;
        let amount = to_vnd(order.total_amount)?;
        let items = order
            .items
            .iter()
            .map(|item| {
                Ok(PaymentItem {
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    price: to_vnd(item.price)?,
                })
            })
            .collect::<Result<Vec<_>, PayOsError>>()?;

        let mut request = PaymentRequest {
            order_code,
            amount,
            description: description_for(order.id),
            buyer_name: non_empty(&order.customer_name),
            buyer_email: non_empty(&order.customer_email),
            buyer_phone: non_empty(&order.phone),
            buyer_address: non_empty(&order.shipping_address),
            items,
            cancel_url: format!("{}/payment/cancel/{}", self.inner.base_url, order.id),
            return_url: format!("{}/payment/success/{}", self.inner.base_url, order.id),
            signature: String::new(),
        };
        request.signature = self.sign(&request.signature_payload());
        Ok(request)
    }

    /// Create a payment link for an order.
    ///
    /// # Errors
    ///
    /// Returns `PayOsError::InvalidOrder` for unpayable orders,
    /// `PayOsError::Api` if PayOS rejects the request, and `PayOsError::Http`
    /// or `PayOsError::Parse` on transport failures.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn create_payment_link(&self, order: &Order) -> Result<PaymentLink, PayOsError> {
        let request = self.build_request(order, Utc::now().timestamp())?;

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("x-client-id", &self.inner.client_id)
            .header("x-api-key", self.inner.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: ApiResponse<PaymentLinkData> = serde_json::from_str(&body).map_err(|e| {
            PayOsError::Parse(format!("failed to parse payment response ({status}): {e}"))
        })?;

        if parsed.code != SUCCESS_CODE {
            return Err(PayOsError::Api {
                code: parsed.code,
                desc: parsed.desc,
            });
        }

        let data = parsed
            .data
            .ok_or_else(|| PayOsError::Parse("payment response has no data".to_string()))?;

        tracing::info!(order_code = request.order_code, "PayOS payment link created");

        Ok(PaymentLink {
            order_code: request.order_code,
            checkout_url: data.checkout_url,
        })
    }
}

/// PayOS order code: the order id followed by the unix timestamp, read as one
/// integer. A fresh code per attempt lets a pending order be paid again.
///
/// # Errors
///
/// Returns `PayOsError::InvalidOrder` if the digits overflow an `i64`.
pub fn order_code_for(order_id: OrderId, unix_secs: i64) -> Result<i64, PayOsError> {
    format!("{order_id}{unix_secs}")
        .parse()
        .map_err(|_| PayOsError::InvalidOrder(format!("order code overflow for order {order_id}")))
}

fn description_for(order_id: OrderId) -> String {
    format!("Thanh toan don hang #{order_id}")
        .chars()
        .take(MAX_DESCRIPTION_CHARS)
        .collect()
}

fn to_vnd(amount: rust_decimal::Decimal) -> Result<i64, PayOsError> {
    money::to_vnd(amount).ok_or_else(|| PayOsError::InvalidOrder(format!("amount out of range: {amount}")))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use tennis_shop_core::{OrderItemId, OrderStatus, ProductId, UserId};

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::models::OrderItem;

    fn client() -> PayOsClient {
        let config = StorefrontConfig::for_tests();
        PayOsClient::new(&config.payos, &config.base_url).unwrap()
    }

    fn order(id: i32, total: i64) -> Order {
        Order {
            id: OrderId::new(id),
            user_id: UserId::new(3),
            customer_name: "Nguyen Van An".to_string(),
            customer_email: "an@example.com".to_string(),
            order_date: Utc::now(),
            status: OrderStatus::Pending,
            shipping_address: "12 Le Loi, District 1".to_string(),
            phone: "0900000000".to_string(),
            subtotal: Decimal::from(total),
            discount_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::from(total),
            promo_code: None,
            items: vec![OrderItem {
                id: OrderItemId::new(1),
                order_id: OrderId::new(id),
                product_id: ProductId::new(5),
                variant_id: None,
                product_name: "Babolat Pure Aero".to_string(),
                quantity: 2,
                price: "550000.75".parse().unwrap(),
            }],
            payment: None,
        }
    }

    #[test]
    fn test_order_code_concatenates_id_and_timestamp() {
        assert_eq!(
            order_code_for(OrderId::new(42), 1_700_000_000).unwrap(),
            421_700_000_000
        );
        assert!(order_code_for(OrderId::new(i32::MAX), 1_700_000_000).is_err());
    }

    #[test]
    fn test_description_is_truncated() {
        assert_eq!(description_for(OrderId::new(7)), "Thanh toan don hang #7");
        assert_eq!(description_for(OrderId::new(12_345)).chars().count(), 25);
    }

    #[test]
    fn test_build_request_signs_and_links_back() {
        let client = client();
        let request = client.build_request(&order(42, 1_100_001), 1_700_000_000).unwrap();

        assert_eq!(request.order_code, 421_700_000_000);
        assert_eq!(request.amount, 1_100_001);
        assert_eq!(request.items.first().map(|i| i.price), Some(550_000));
        assert_eq!(request.return_url, "http://localhost:3000/payment/success/42");
        assert_eq!(request.cancel_url, "http://localhost:3000/payment/cancel/42");
        assert_eq!(request.signature, client.sign(&request.signature_payload()));
        assert_eq!(request.signature.len(), 64);
    }

    #[test]
    fn test_build_request_rejects_unpayable_orders() {
        let client = client();

        let mut empty = order(1, 100);
        empty.items.clear();
        assert!(matches!(
            client.build_request(&empty, 1),
            Err(PayOsError::InvalidOrder(_))
        ));

        assert!(matches!(
            client.build_request(&order(1, 0), 1),
            Err(PayOsError::InvalidOrder(_))
        ));
    }
}
