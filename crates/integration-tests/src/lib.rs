//! Integration tests for the Tennis Shop storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and seed a database, then start the server
//! cargo run -p tennis-shop-cli -- migrate
//! cargo run -p tennis-shop-cli -- seed
//! cargo run -p tennis-shop-storefront
//!
//! # Run the ignored HTTP tests against it
//! cargo test -p tennis-shop-integration-tests -- --ignored
//! ```
//!
//! `STOREFRONT_BASE_URL` points the tests at another server
//! (default `http://localhost:3000`).
//!
//! Most tests register a fresh account, and `/auth` POSTs are rate limited
//! per client address (burst of 5, then one every 6 seconds). Run a single
//! test file at a time, e.g. `--test shopping_flow`, or expect `429`s.

use reqwest::{Client, StatusCode, redirect};
use uuid::Uuid;

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client with a cookie store that does not follow redirects, so tests can
/// assert on `303 See Other` targets.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// A fresh address that will not collide with earlier runs.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

pub const TEST_PASSWORD: &str = "correct-horse-42";

/// Register a new customer and return a signed-in client with their email.
///
/// # Panics
///
/// Panics if registration does not redirect.
pub async fn signed_in_client() -> (Client, String) {
    let client = client();
    let email = unique_email("customer");
    let resp = client
        .post(format!("{}/auth/register", base_url()))
        .form(&[
            ("full_name", "Integration Tester"),
            ("email", email.as_str()),
            ("password", TEST_PASSWORD),
            ("password_confirm", TEST_PASSWORD),
            ("phone", "0901234567"),
            ("address", "1 Court Street, District 1"),
            ("return_to", "/"),
        ])
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER, "registration should redirect");
    (client, email)
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// First product id offered with a direct add-to-cart form on a listing page.
#[must_use]
pub fn first_addable_product(html: &str) -> Option<i32> {
    const MARKER: &str = r#"name="product_id" value=""#;
    let start = html.find(MARKER)? + MARKER.len();
    let rest = html.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_addable_product_reads_hidden_input() {
        let html = r#"<form action="/cart/add"><input type="hidden" name="product_id" value="42"></form>"#;
        assert_eq!(first_addable_product(html), Some(42));
        assert_eq!(first_addable_product("<p>no forms</p>"), None);
    }

    #[test]
    fn test_unique_email_differs_per_call() {
        assert_ne!(unique_email("a"), unique_email("a"));
    }
}
