//! Registration, sign-in and sign-out.
//!
//! Requires a migrated database with the storefront running.

use reqwest::StatusCode;

use tennis_shop_integration_tests::{
    TEST_PASSWORD, base_url, client, location, signed_in_client, unique_email,
};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_register_signs_in_and_logout_signs_out() {
    let (client, email) = signed_in_client().await;

    let resp = client
        .get(format!("{}/account", base_url()))
        .send()
        .await
        .expect("Failed to load account");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("body").contains(&email));

    let resp = client
        .post(format!("{}/auth/logout", base_url()))
        .send()
        .await
        .expect("Failed to sign out");
    assert_eq!(location(&resp), "/?success=logged_out");

    let resp = client
        .get(format!("{}/account", base_url()))
        .send()
        .await
        .expect("Failed to load account");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_login_with_wrong_password_is_rejected() {
    let (registered, email) = signed_in_client().await;
    drop(registered);

    let client = client();
    let resp = client
        .post(format!("{}/auth/login", base_url()))
        .form(&[("email", email.as_str()), ("password", "not-the-password")])
        .send()
        .await
        .expect("Failed to post login");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(format!("{}/auth/login", base_url()))
        .form(&[
            ("email", email.as_str()),
            ("password", TEST_PASSWORD),
            ("return_to", "/orders"),
        ])
        .send()
        .await
        .expect("Failed to post login");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/orders");
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_login_ignores_offsite_return_to() {
    let (registered, email) = signed_in_client().await;
    drop(registered);

    let resp = client()
        .post(format!("{}/auth/login", base_url()))
        .form(&[
            ("email", email.as_str()),
            ("password", TEST_PASSWORD),
            ("return_to", "//evil.example.com"),
        ])
        .send()
        .await
        .expect("Failed to post login");
    assert_eq!(location(&resp), "/");
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_register_rejects_mismatched_passwords() {
    let email = unique_email("mismatch");
    let resp = client()
        .post(format!("{}/auth/register", base_url()))
        .form(&[
            ("full_name", "Mismatch"),
            ("email", email.as_str()),
            ("password", TEST_PASSWORD),
            ("password_confirm", "something-else"),
        ])
        .send()
        .await
        .expect("Failed to post registration");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.text().await.expect("body").contains("Passwords do not match."));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_customers_cannot_open_admin() {
    let (client, _) = signed_in_client().await;
    let resp = client
        .get(format!("{}/admin", base_url()))
        .send()
        .await
        .expect("Failed to request admin");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
