//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{
    AuthError, CartError, CatalogError, ChatError, CheckoutError, NewsletterError, OrderError,
    PromoError, ReviewError,
};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or account operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    #[error("Newsletter error: {0}")]
    Newsletter(#[from] NewsletterError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Promo code error: {0}")]
    Promo(#[from] PromoError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is signed in but may not do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

const fn order_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::InvalidStatus(_) | OrderError::InvalidOrder(_) | OrderError::NotCancellable => {
            StatusCode::BAD_REQUEST
        }
        OrderError::NotFound => StatusCode::NOT_FOUND,
        OrderError::Forbidden => StatusCode::FORBIDDEN,
        OrderError::Repository(e) => repository_status(e),
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(e) => repository_status(e),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::CannotDeleteSelf => StatusCode::FORBIDDEN,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::Required(_)
                | AuthError::NoPassword
                | AuthError::UnknownRole(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(e) => repository_status(e),
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cart(err) => match err {
                CartError::ProductNotFound => StatusCode::NOT_FOUND,
                CartError::Repository(e) => repository_status(e),
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Catalog(err) => match err {
                CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
                CatalogError::NotFound => StatusCode::NOT_FOUND,
                CatalogError::ImageUpload(_) => StatusCode::BAD_GATEWAY,
                CatalogError::Repository(e) => repository_status(e),
            },
            Self::Order(err) => order_status(err),
            Self::Checkout(err) => match err {
                CheckoutError::PaymentLink(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::Order(e) => order_status(e),
                CheckoutError::Repository(e) => repository_status(e),
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Review(err) => match err {
                ReviewError::ProductNotFound => StatusCode::NOT_FOUND,
                ReviewError::AlreadyReviewed => StatusCode::CONFLICT,
                ReviewError::Repository(e) => repository_status(e),
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Newsletter(err) => match err {
                NewsletterError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                NewsletterError::Repository(e) => repository_status(e),
            },
            Self::Chat(err) => match err {
                ChatError::Repository(e) => repository_status(e),
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Promo(err) => match err {
                PromoError::Invalid(_) => StatusCode::BAD_REQUEST,
                PromoError::Duplicate => StatusCode::CONFLICT,
                PromoError::NotFound => StatusCode::NOT_FOUND,
                PromoError::Repository(e) => repository_status(e),
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show the client. Server-side failures get a generic text.
    #[must_use]
    pub fn public_message(&self) -> String {
        let status = self.status();
        if status.is_server_error() {
            return if status == StatusCode::BAD_GATEWAY {
                "External service error".to_string()
            } else {
                "Internal server error".to_string()
            };
        }
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(what)) => what.clone(),
            Self::Auth(err) => err.user_message(),
            Self::Cart(err) => err.to_string(),
            Self::Catalog(err) => err.to_string(),
            Self::Order(err) | Self::Checkout(CheckoutError::Order(err)) => err.to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Review(err) => err.to_string(),
            Self::Newsletter(err) => err.to_string(),
            Self::Chat(err) => err.to_string(),
            Self::Promo(err) => err.to_string(),
            Self::Unauthorized(msg) | Self::Forbidden(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called whenever a user is stored in the session.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context. Called on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::NotFound("test".to_string())), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AppError::Forbidden("test".to_string())), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_errors_map_to_statuses() {
        assert_eq!(get_status(OrderError::Forbidden.into()), StatusCode::FORBIDDEN);
        assert_eq!(get_status(OrderError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(CheckoutError::Order(OrderError::Forbidden).into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(get_status(CheckoutError::BadSignature.into()), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(CartError::VariantRequired.into()), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(ReviewError::AlreadyReviewed.into()), StatusCode::CONFLICT);
        assert_eq!(get_status(AuthError::UserAlreadyExists.into()), StatusCode::CONFLICT);
        assert_eq!(
            get_status(RepositoryError::DataCorruption("x".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("connection string leaked".to_string());
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::from(CartError::InsufficientStock(2));
        assert_eq!(err.public_message(), "Insufficient stock available. Only 2 available");

        let err = AppError::from(OrderError::NotCancellable);
        assert_eq!(err.public_message(), "Only pending orders can be cancelled.");
    }

    #[test]
    fn test_sentry_user_follows_sign_in_and_out() {
        let events = sentry::test::with_captured_events(|| {
            set_sentry_user(&42, Some("player@example.com"));
            sentry::capture_message("signed in", sentry::Level::Info);
            clear_sentry_user();
            sentry::capture_message("signed out", sentry::Level::Info);
        });
        assert_eq!(events.len(), 2);
        let user = events[0].user.as_ref();
        assert_eq!(user.and_then(|u| u.id.as_deref()), Some("42"));
        assert_eq!(user.and_then(|u| u.email.as_deref()), Some("player@example.com"));
        assert!(events[1].user.is_none());
    }
}
