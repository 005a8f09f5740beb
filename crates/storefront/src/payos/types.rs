//! Wire types for the PayOS merchant API.

use serde::{Deserialize, Serialize};

/// Result code PayOS uses for success, in responses and webhooks alike.
pub const SUCCESS_CODE: &str = "00";

/// Line item shown on the PayOS checkout page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentItem {
    pub name: String,
    pub quantity: i32,
    /// Whole dong.
    pub price: i64,
}

/// Body of `POST /v2/payment-requests`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_code: i64,
    pub amount: i64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_address: Option<String>,
    pub items: Vec<PaymentItem>,
    pub cancel_url: String,
    pub return_url: String,
    pub signature: String,
}

impl PaymentRequest {
    /// The string PayOS expects the request signature over. Keys are in
    /// alphabetical order.
    #[must_use]
    pub fn signature_payload(&self) -> String {
        format!(
            "amount={}&cancelUrl={}&description={}&orderCode={}&returnUrl={}",
            self.amount, self.cancel_url, self.description, self.order_code, self.return_url
        )
    }
}

/// Envelope shared by API responses and webhook calls.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub code: String,
    #[serde(default)]
    pub desc: String,
    pub data: Option<T>,
}

/// `data` of a successful payment-request response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkData {
    pub checkout_url: String,
    #[serde(default)]
    pub payment_link_id: Option<String>,
    #[serde(default)]
    pub order_code: Option<i64>,
}

/// A created payment link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLink {
    pub order_code: i64,
    pub checkout_url: String,
}

/// Webhook body. `data` stays raw JSON because the signature is computed over
/// every field PayOS sent, including ones this type does not model.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub success: bool,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub signature: String,
}

impl WebhookPayload {
    /// `data.orderCode`, which PayOS sends as a number.
    #[must_use]
    pub fn order_code(&self) -> Option<i64> {
        match self.data.get("orderCode")? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// `data.code`, falling back to the envelope code.
    #[must_use]
    pub fn payment_code(&self) -> &str {
        self.data
            .get("code")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(&self.code)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_request_serializes_camel_case() {
        let request = PaymentRequest {
            order_code: 421_700_000_000,
            amount: 1_100_000,
            description: "Thanh toan don hang #42".to_string(),
            buyer_name: Some("Lan".to_string()),
            buyer_email: None,
            buyer_phone: None,
            buyer_address: None,
            items: vec![PaymentItem {
                name: "Pure Drive".to_string(),
                quantity: 1,
                price: 1_000_000,
            }],
            cancel_url: "http://localhost:3000/payment/cancel/42".to_string(),
            return_url: "http://localhost:3000/payment/success/42".to_string(),
            signature: "abc".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["orderCode"], 421_700_000_000_i64);
        assert_eq!(json["cancelUrl"], "http://localhost:3000/payment/cancel/42");
        assert_eq!(json["buyerName"], "Lan");
        assert!(json.get("buyerEmail").is_none());
    }

    #[test]
    fn test_signature_payload_is_alphabetical() {
        let request = PaymentRequest {
            order_code: 7,
            amount: 100,
            description: "d".to_string(),
            buyer_name: None,
            buyer_email: None,
            buyer_phone: None,
            buyer_address: None,
            items: Vec::new(),
            cancel_url: "c".to_string(),
            return_url: "r".to_string(),
            signature: String::new(),
        };
        assert_eq!(
            request.signature_payload(),
            "amount=100&cancelUrl=c&description=d&orderCode=7&returnUrl=r"
        );
    }

    #[test]
    fn test_webhook_payload_fields() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{"code":"00","desc":"success","success":true,
                "data":{"orderCode":421700,"amount":1000,"code":"00","desc":"ok"},
                "signature":"deadbeef"}"#,
        )
        .unwrap();
        assert_eq!(payload.order_code(), Some(421_700));
        assert_eq!(payload.payment_code(), "00");
    }
}
