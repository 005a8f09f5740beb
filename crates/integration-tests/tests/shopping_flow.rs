//! Cart, checkout and order management.
//!
//! Requires a migrated and seeded database with the storefront running.
//! Orders are paid cash on delivery so no PayOS credentials are needed.

use reqwest::{Client, StatusCode};
use serde_json::Value;

use tennis_shop_core::OrderStatus;
use tennis_shop_integration_tests::{base_url, first_addable_product, location, signed_in_client};

async fn add_first_product(client: &Client, quantity: &str) -> Value {
    let listing = client
        .get(format!("{}/products", base_url()))
        .send()
        .await
        .expect("Failed to load listing")
        .text()
        .await
        .expect("body");
    let product_id = first_addable_product(&listing).expect("seeded products without variants");

    client
        .post(format!("{}/cart/add", base_url()))
        .header("Accept", "application/json")
        .form(&[
            ("product_id", product_id.to_string().as_str()),
            ("quantity", quantity),
        ])
        .send()
        .await
        .expect("Failed to add to cart")
        .json()
        .await
        .expect("JSON body")
}

#[tokio::test]
#[ignore = "Requires running storefront server and seed data"]
async fn test_add_to_cart_updates_count() {
    let (client, _) = signed_in_client().await;

    let added = add_first_product(&client, "2").await;
    assert_eq!(added["success"], true);
    assert_eq!(added["cartCount"], 2);

    let count: Value = client
        .get(format!("{}/cart/count", base_url()))
        .send()
        .await
        .expect("Failed to get count")
        .json()
        .await
        .expect("JSON body");
    assert_eq!(count["count"], 2);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seed data"]
async fn test_zero_quantity_is_rejected() {
    let (client, _) = signed_in_client().await;
    let added = add_first_product(&client, "0").await;
    assert_eq!(added["success"], false);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_with_empty_cart_goes_back_to_cart() {
    let (client, _) = signed_in_client().await;
    let resp = client
        .get(format!("{}/checkout", base_url()))
        .send()
        .await
        .expect("Failed to load checkout");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/cart?error=empty_cart");
}

#[tokio::test]
#[ignore = "Requires running storefront server and seed data"]
async fn test_cash_on_delivery_order_can_be_cancelled() {
    let (client, _) = signed_in_client().await;
    add_first_product(&client, "1").await;

    let resp = client
        .post(format!("{}/checkout", base_url()))
        .form(&[
            ("shipping_address", "1 Court Street, District 1"),
            ("phone", "0901234567"),
            ("payment_method", "COD"),
            ("promo_code", ""),
        ])
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let order_url = location(&resp);
    assert!(order_url.starts_with("/orders/"), "{order_url}");
    assert!(order_url.ends_with("?success=order_placed"), "{order_url}");
    let order_path = order_url.trim_end_matches("?success=order_placed").to_string();

    let count: Value = client
        .get(format!("{}/cart/count", base_url()))
        .send()
        .await
        .expect("Failed to get count")
        .json()
        .await
        .expect("JSON body");
    assert_eq!(count["count"], 0, "placing an order empties the cart");

    let page = client
        .get(format!("{}{order_path}", base_url()))
        .send()
        .await
        .expect("Failed to load order")
        .text()
        .await
        .expect("body");
    assert!(page.contains(OrderStatus::Pending.as_str()));

    let resp = client
        .post(format!("{}{order_path}/cancel", base_url()))
        .send()
        .await
        .expect("Failed to cancel order");
    assert_eq!(location(&resp), format!("{order_path}?success=order_cancelled"));

    let resp = client
        .post(format!("{}{order_path}/cancel", base_url()))
        .send()
        .await
        .expect("Failed to cancel order twice");
    assert_eq!(location(&resp), format!("{order_path}?error=not_cancellable"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and seed data"]
async fn test_unknown_promo_code_keeps_the_form() {
    let (client, _) = signed_in_client().await;
    add_first_product(&client, "1").await;

    let resp = client
        .post(format!("{}/checkout", base_url()))
        .form(&[
            ("shipping_address", "1 Court Street"),
            ("phone", "0901234567"),
            ("payment_method", "COD"),
            ("promo_code", "NOSUCHCODE"),
        ])
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_webhook_with_bad_signature_is_rejected() {
    let resp = tennis_shop_integration_tests::client()
        .post(format!("{}/payment/webhook", base_url()))
        .json(&serde_json::json!({
            "code": "00",
            "desc": "success",
            "success": true,
            "data": { "orderCode": 1, "amount": 1000, "code": "00", "desc": "success" },
            "signature": "0000"
        }))
        .send()
        .await
        .expect("Failed to post webhook");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("JSON body");
    assert_eq!(body["success"], false);
}
