//! Public pages and access control.
//!
//! Requires a migrated and seeded database with the storefront running.

use reqwest::StatusCode;

use tennis_shop_integration_tests::{base_url, client, location};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let client = client();
    let resp = client
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to call /health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");

    let resp = client
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to call /health/ready");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_home_page_sets_security_headers() {
    let resp = client()
        .get(format!("{}/", base_url()))
        .send()
        .await
        .expect("Failed to load home page");

    assert_eq!(resp.status(), StatusCode::OK);
    let csp = resp
        .headers()
        .get("content-security-policy")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(csp.contains("'nonce-"), "CSP should carry a nonce: {csp}");
    assert!(resp.headers().contains_key("x-request-id"));

    let body = resp.text().await.expect("body");
    assert!(body.contains("/newsletter/subscribe"));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_catalog_listing_search_and_sorting() {
    let client = client();
    for path in [
        "/products",
        "/products?sort=pricelow",
        "/products?sort=nameza&category_id=1",
        "/products/search?q=racket",
    ] {
        let resp = client
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .expect("Failed to load listing");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }

    let resp = client
        .get(format!("{}/products/search?q=", base_url()))
        .send()
        .await
        .expect("Failed to search");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("body").contains("All products"));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_missing_product_is_not_found() {
    let resp = client()
        .get(format!("{}/products/999999", base_url()))
        .send()
        .await
        .expect("Failed to load product");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_protected_pages_redirect_to_login() {
    let client = client();
    for (path, encoded) in [("/cart", "%2Fcart"), ("/orders", "%2Forders"), ("/account", "%2Faccount")] {
        let resp = client
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .expect("Failed to request protected page");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&resp), format!("/auth/login?return_to={encoded}"));
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_chat_api_requires_login() {
    let resp = client()
        .post(format!("{}/api/chat", base_url()))
        .json(&serde_json::json!({ "message": "Which racket suits a beginner?" }))
        .send()
        .await
        .expect("Failed to call chat API");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_newsletter_subscribe_redirects_back() {
    let email = tennis_shop_integration_tests::unique_email("newsletter");
    let client = client();
    let subscribe = || {
        client
            .post(format!("{}/newsletter/subscribe", base_url()))
            .form(&[("email", email.as_str()), ("return_to", "/blog")])
            .send()
    };

    let resp = subscribe().await.expect("Failed to subscribe");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/blog?success=subscribed");

    let resp = subscribe().await.expect("Failed to subscribe again");
    assert_eq!(location(&resp), "/blog?success=already_subscribed");
}
