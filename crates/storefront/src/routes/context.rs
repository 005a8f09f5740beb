//! Data every full page needs: the signed-in user, the cart badge, the CSP
//! nonce and an optional flash message.
//!
//! Flash messages travel as `?success=code` / `?error=code` after a redirect.
//! Only known codes render, so nothing user-supplied reaches the page.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
    response::Redirect,
};
use tower_sessions::Session;

use crate::db::CartRepository;
use crate::middleware::CspNonce;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: &'static str,
}

impl Flash {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, FlashKind::Error)
    }

    #[must_use]
    pub const fn success(message: &'static str) -> Self {
        Self {
            kind: FlashKind::Success,
            message,
        }
    }

    #[must_use]
    pub const fn error(message: &'static str) -> Self {
        Self {
            kind: FlashKind::Error,
            message,
        }
    }
}

fn success_message(code: &str) -> Option<&'static str> {
    Some(match code {
        "order_placed" => "Your order has been placed.",
        "payment_success" => "Payment received. Thank you!",
        "order_cancelled" => "Your order has been cancelled.",
        "cart_added" => "Added to your cart.",
        "cart_updated" => "Cart updated.",
        "cart_cleared" => "Your cart is now empty.",
        "item_removed" => "Item removed from your cart.",
        "registered" => "Welcome to Tennis Shop!",
        "logged_in" => "Signed in.",
        "logged_out" => "You have been signed out.",
        "profile_updated" => "Profile updated.",
        "password_changed" => "Password changed.",
        "review_added" => "Thanks for your review!",
        "subscribed" => "Thanks for subscribing to our newsletter!",
        "already_subscribed" => "You are already subscribed to our newsletter.",
        "product_saved" => "Product saved.",
        "product_deleted" => "Product hidden from the shop.",
        "user_updated" => "User updated.",
        "user_deleted" => "User deleted.",
        "role_changed" => "Role changed.",
        "status_updated" => "Order status updated.",
        "order_deleted" => "Order deleted.",
        "subscriber_removed" => "Subscriber removed.",
        "promo_created" => "Promo code created.",
        "promo_toggled" => "Promo code updated.",
        _ => return None,
    })
}

fn error_message(code: &str) -> Option<&'static str> {
    Some(match code {
        "payos_failed" => "We could not reach the payment provider. Please try paying again.",
        "payment_cancelled" => "Payment was cancelled. Your order is still pending.",
        "not_pending" => "Can only retry payment for pending orders.",
        "not_cancellable" => "Only pending orders can be cancelled.",
        "empty_cart" => "Your cart is empty.",
        "invalid_state" => "Sign-in expired, please try again.",
        "google_failed" => "Google sign-in failed, please try again.",
        "google_disabled" => "Google sign-in is not available.",
        "product_not_found" => "Product not found",
        "variant_required" => "Please select a product variant",
        "variant_not_found" => "Selected variant not found",
        "out_of_stock" => "Not enough stock for that quantity.",
        "invalid_quantity" => "Please choose a valid quantity.",
        "already_reviewed" => "You have already reviewed this product.",
        "invalid_review" => "Please choose a rating from 1 to 5 and write a comment.",
        "invalid_email" => "Please enter a valid email address.",
        "cannot_delete_self" => "You cannot delete your own account.",
        "invalid_status" => "That order status is not allowed.",
        "invalid_promo" => "Promo code could not be saved. Check the code, percent and dates.",
        "duplicate_promo" => "A promo code with that name already exists.",
        "image_failed" => "Image upload failed. The product was not saved.",
        _ => return None,
    })
}

/// Read the flash message from a query string.
#[must_use]
pub fn flash_from_query(query: Option<&str>) -> Option<Flash> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes()).find_map(|(key, value)| match key.as_ref() {
        "success" => success_message(&value).map(Flash::success),
        "error" => error_message(&value).map(Flash::error),
        _ => None,
    })
}

/// Shared layout data, extracted in every page handler.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub cart_count: i64,
    pub nonce: String,
    pub flash: Option<Flash>,
    pub google_enabled: bool,
    pub path: String,
}

impl PageContext {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", CurrentUser::first_name)
    }

    /// Replace the flash, e.g. when re-rendering a form with an error.
    #[must_use]
    pub const fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = Some(flash);
        self
    }

    /// A context for pages rendered outside a request (tests).
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            user: None,
            cart_count: 0,
            nonce: String::new(),
            flash: None,
            google_enabled: false,
            path: "/".to_string(),
        }
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        let cart_count = match &user {
            Some(u) => CartRepository::new(state.pool())
                .item_count(u.id)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Failed to load cart count");
                    0
                }),
            None => 0,
        };

        let nonce = parts
            .extensions
            .get::<CspNonce>()
            .map(|n| n.value().to_string())
            .unwrap_or_default();

        Ok(Self {
            user,
            cart_count,
            nonce,
            flash: flash_from_query(parts.uri.query()),
            google_enabled: state.google().is_some(),
            path: parts
                .extensions
                .get::<OriginalUri>()
                .map_or(&parts.uri, |original| &original.0)
                .path()
                .to_string(),
        })
    }
}

/// Redirect to `path` carrying a flash code.
#[must_use]
pub fn redirect_flash(path: &str, kind: FlashKind, code: &str) -> Redirect {
    let key = match kind {
        FlashKind::Success => "success",
        FlashKind::Error => "error",
    };
    let sep = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{path}{sep}{key}={code}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_render() {
        assert_eq!(
            flash_from_query(Some("success=order_placed")),
            Some(Flash::success("Your order has been placed."))
        );
        let flash = flash_from_query(Some("x=1&error=payos_failed"));
        assert!(flash.is_some_and(|f| f.is_error()));
    }

    #[test]
    fn test_redirect_flash_appends_query() {
        use axum::response::IntoResponse;

        let response = redirect_flash("/orders/3", FlashKind::Success, "order_placed").into_response();
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/orders/3?success=order_placed")
        );
        let response = redirect_flash("/products?sort=newest", FlashKind::Error, "out_of_stock").into_response();
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/products?sort=newest&error=out_of_stock")
        );
    }

    #[test]
    fn test_unknown_codes_are_dropped() {
        assert_eq!(flash_from_query(Some("error=<script>")), None);
        assert_eq!(flash_from_query(Some("success=")), None);
        assert_eq!(flash_from_query(None), None);
    }
}
