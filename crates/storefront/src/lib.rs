//! Tennis Shop storefront library.
//!
//! The router, services and API clients behind the `tennis-shop-storefront`
//! binary, exposed as a library so they can be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod gemini;
pub mod google;
pub mod imagekit;
pub mod middleware;
pub mod models;
pub mod payos;
pub mod routes;
pub mod services;
pub mod state;
#[cfg(test)]
mod test_support;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    routing::get,
};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Static assets, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Build the complete application: pages, health checks, static files and
/// the middleware stack.
///
/// Layer order, outermost first: Sentry, trace span, request id, security
/// headers, session.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// The application as served: [`app`] behind trailing-slash normalization,
/// so `/products/` and `/products` reach the same handler.
/// `Router::layer` runs after route matching, so the layer wraps the router.
pub fn service(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(app(state))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, header};
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;

    /// An app whose pool never connects unless a handler queries it.
    fn test_app() -> Router {
        let config = StorefrontConfig::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/tennis_shop_test")
            .unwrap();
        app(AppState::new(config, pool).unwrap())
    }

    fn test_service() -> NormalizePath<Router> {
        let config = StorefrontConfig::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/tennis_shop_test")
            .unwrap();
        service(AppState::new(config, pool).unwrap())
    }

    fn get_request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn location(response: &axum::response::Response) -> Option<&str> {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = test_app().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn trailing_slashes_reach_the_same_route() {
        let response = test_service().oneshot(get_request("/health/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = test_service().oneshot(get_request("/cart/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/auth/login?return_to=%2Fcart"));
    }

    #[tokio::test]
    async fn responses_carry_security_headers_and_request_id() {
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get("x-request-id").and_then(|v| v.to_str().ok()),
            Some("abc-123")
        );
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
        assert_eq!(
            headers
                .get(header::X_CONTENT_TYPE_OPTIONS)
                .and_then(|v| v.to_str().ok()),
            Some("nosniff")
        );
    }

    #[tokio::test]
    async fn cart_redirects_anonymous_visitors_to_login() {
        let response = test_app().oneshot(get_request("/cart")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/auth/login?return_to=%2Fcart"));
    }

    #[tokio::test]
    async fn nested_admin_routes_return_to_the_full_path() {
        let response = test_app().oneshot(get_request("/admin/orders")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            Some("/auth/login?return_to=%2Fadmin%2Forders")
        );
    }

    #[tokio::test]
    async fn chat_api_rejects_anonymous_callers_with_401() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-real-ip", "203.0.113.9")
            .body(Body::from(r#"{"message":"hi"}"#))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn google_login_without_credentials_explains_itself() {
        let response = test_app().oneshot(get_request("/auth/google")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            Some("/auth/login?error=google_disabled")
        );
    }

    #[tokio::test]
    async fn google_callback_is_rate_limited_per_client() {
        let app = test_app();
        let callback = |ip: &'static str| {
            Request::builder()
                .uri("/auth/google/callback?code=x&state=y")
                .header("x-real-ip", ip)
                .body(Body::empty())
                .unwrap()
        };

        for _ in 0..5 {
            let response = app.clone().oneshot(callback("198.51.100.20")).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        }
        let response = app.clone().oneshot(callback("198.51.100.20")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app.oneshot(callback("198.51.100.21")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn unknown_paths_are_404() {
        let response = test_app()
            .oneshot(get_request("/no-such-page"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
