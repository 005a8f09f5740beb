//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//!
//! # Catalog
//! GET  /products                  - Listing (?category_id, ?sort)
//! GET  /products/search           - Search (?q, ?sort)
//! GET  /products/{id}             - Product detail with reviews
//! POST /products/{id}/reviews     - Add a review (auth)
//!
//! # Cart (auth)
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add item (JSON for scripts, redirect otherwise)
//! POST /cart/update               - Update quantity (JSON)
//! POST /cart/remove               - Remove line
//! POST /cart/clear                - Empty the cart
//! GET  /cart/count                - Badge count (JSON)
//!
//! # Checkout and payment (auth, except the webhook)
//! GET  /checkout                  - Summary and shipping form
//! POST /checkout                  - Place order
//! GET  /payment/success/{id}      - PayOS return URL
//! GET  /payment/cancel/{id}       - PayOS cancel URL
//! GET  /payment/retry/{id}        - New payment link for a pending order
//! POST /payment/webhook           - Signed PayOS notification
//!
//! # Orders (auth)
//! GET  /orders                    - Order history
//! GET  /orders/{id}               - Order detail (owner only)
//! POST /orders/{id}/cancel        - Cancel a pending order
//!
//! # Auth
//! GET  /auth/login, /auth/register - Forms
//! POST /auth/login, /auth/register - Actions (rate limited)
//! POST /auth/logout               - Sign out
//! GET  /auth/google               - Redirect to Google
//! GET  /auth/google/callback      - Google OAuth callback (rate limited)
//!
//! # Account (auth)
//! GET  /account                   - Profile and recent orders
//! GET  /account/edit              - Profile form
//! POST /account/edit              - Save profile
//! POST /account/password          - Change password
//!
//! # Content
//! GET  /blog, /blog/{id}          - Blog
//! POST /newsletter/subscribe      - Newsletter sign-up
//! GET  /chat                      - Shopping assistant (auth)
//! POST /api/chat                  - Assistant reply (JSON, rate limited)
//!
//! # Back-office
//! /admin/...                      - See [`admin`]
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod blog;
pub mod cart;
pub mod chat;
pub mod checkout;
pub mod context;
pub mod google_auth;
pub mod home;
pub mod newsletter;
pub mod orders;
pub mod products;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::filters;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;
use context::PageContext;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page))
        .route("/login", post(auth::login).layer(auth_rate_limiter()))
        .route("/register", get(auth::register_page))
        .route("/register", post(auth::register).layer(auth_rate_limiter()))
        .route("/logout", post(auth::logout))
        // Google OAuth
        .route("/google", get(google_auth::login))
        .route(
            "/google/callback",
            get(google_auth::callback).layer(auth_rate_limiter()),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/search", get(products::search))
        .route("/{id}", get(products::show))
        .route("/{id}/reviews", post(products::add_review))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/success/{order_id}", get(checkout::payment_success))
        .route("/cancel/{order_id}", get(checkout::payment_cancel))
        .route("/retry/{order_id}", get(checkout::retry_payment))
        .route("/webhook", post(checkout::webhook))
}

/// Create the order history router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/edit", get(account::edit_page).post(account::edit))
        .route("/password", post(account::change_password))
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/chat", post(chat::message).layer(api_rate_limiter()))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place))
        .nest("/payment", payment_routes())
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .route("/blog", get(blog::index))
        .route("/blog/{id}", get(blog::show))
        .route("/newsletter/subscribe", post(newsletter::subscribe))
        .route("/chat", get(chat::page))
        .nest("/api", api_routes())
        .nest("/admin", admin::router())
        .fallback(not_found)
}

#[derive(Template, WebTemplate)]
#[template(path = "errors/not_found.html")]
pub struct NotFoundTemplate {
    pub ctx: PageContext,
}

async fn not_found(ctx: PageContext) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NotFoundTemplate { ctx })
}
