//! Back-office routes, mounted under `/admin`.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin), so
//! signed-out visitors are sent to the login page and customers get 403.

pub mod dashboard;
pub mod newsletter;
pub mod orders;
pub mod products;
pub mod promo;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the admin router.
pub fn router() -> Router<AppState> {
    let product_forms = Router::new()
        .route("/products/new", get(products::new_page).post(products::create))
        .route(
            "/products/{id}/edit",
            get(products::edit_page).post(products::update),
        )
        .layer(DefaultBodyLimit::max(products::MAX_UPLOAD_BYTES));

    Router::new()
        .route("/", get(dashboard::index))
        // Users
        .route("/users", get(users::index))
        .route("/users/{id}/edit", get(users::edit_page).post(users::update))
        .route("/users/{id}/delete", post(users::delete))
        .route("/users/{id}/role", post(users::change_role))
        // Products
        .route("/products", get(products::index))
        .route("/products/{id}/delete", post(products::delete))
        .merge(product_forms)
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/orders/{id}/delete", post(orders::delete))
        // Newsletter and promotions
        .route("/newsletter", get(newsletter::index))
        .route("/newsletter/{id}/delete", post(newsletter::remove))
        .route("/promo-codes", get(promo::index).post(promo::create))
        .route("/promo-codes/{id}/toggle", post(promo::toggle))
}
