//! Authentication extractors.
//!
//! The signed-in user lives in the session as a [`CurrentUser`]. Handlers
//! pick the guard they need: [`RequireAuth`], [`RequireAdmin`] or
//! [`OptionalAuth`].

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{HeaderMap, Method, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// Page requests are redirected to the login page, `/api/` requests get 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.full_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a signed-in admin. Other users get 403.
pub struct RequireAdmin(pub CurrentUser);

/// Error returned when a guard rejects the request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin(Option<String>),
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Signed in without the admin role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(None) => Redirect::to("/auth/login").into_response(),
            Self::RedirectToLogin(Some(return_to)) => Redirect::to(&format!(
                "/auth/login?return_to={}",
                urlencoding::encode(&return_to)
            ))
            .into_response(),
            Self::Unauthorized => {
                AppError::Unauthorized("Sign in required".to_string()).into_response()
            }
            Self::Forbidden => AppError::Forbidden("Access denied".to_string()).into_response(),
        }
    }
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Whether the caller is script code expecting JSON rather than a page.
#[must_use]
pub fn wants_json(headers: &HeaderMap) -> bool {
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    let is_xhr = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
    accepts_json || is_xhr
}

fn login_rejection(parts: &Parts) -> AuthRejection {
    // Nested routers see a stripped URI
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0);
    if uri.path().starts_with("/api/") || wants_json(&parts.headers) {
        return AuthRejection::Unauthorized;
    }
    // Only GET targets are worth coming back to after login.
    let return_to = (parts.method == Method::GET)
        .then(|| uri.path_and_query().map(|pq| pq.as_str().to_string()))
        .flatten();
    AuthRejection::RedirectToLogin(return_to)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await
            .map(Self)
            .ok_or_else(|| login_rejection(parts))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await
            .ok_or_else(|| login_rejection(parts))?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Non-admin tried to open admin page");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is signed in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Store the signed-in user in the session. The session id is cycled first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Sign out: drop everything in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    clear_sentry_user();
    session.flush().await
}

/// A safe post-login redirect target: a local absolute path only.
#[must_use]
pub fn safe_return_to(value: Option<&str>) -> &str {
    match value {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};

    use super::*;

    fn parts(method: Method, uri: &str) -> Parts {
        let (parts, ()) = Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap_or_default()
            .into_parts();
        parts
    }

    #[test]
    fn test_api_requests_get_unauthorized() {
        let rejection = login_rejection(&parts(Method::POST, "/api/chat"));
        assert!(matches!(rejection, AuthRejection::Unauthorized));
    }

    #[test]
    fn test_page_requests_redirect_with_return_to() {
        let rejection = login_rejection(&parts(Method::GET, "/orders/5?x=1"));
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/auth/login?return_to=%2Forders%2F5%3Fx%3D1")
        );
    }

    #[test]
    fn test_post_requests_redirect_without_return_to() {
        let rejection = login_rejection(&parts(Method::POST, "/cart/add"));
        assert!(matches!(rejection, AuthRejection::RedirectToLogin(None)));
    }

    #[test]
    fn test_wants_json() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));
        headers.insert("x-requested-with", axum::http::HeaderValue::from_static("XMLHttpRequest"));
        assert!(wants_json(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, axum::http::HeaderValue::from_static("application/json"));
        assert!(wants_json(&headers));
    }

    #[test]
    fn test_forbidden_is_403() {
        assert_eq!(AuthRejection::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_rejections_render_through_app_error() {
        let response = AuthRejection::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        assert_eq!(&body[..], b"Sign in required");

        let response = AuthRejection::Forbidden.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        assert_eq!(&body[..], b"Access denied");
    }

    #[test]
    fn test_safe_return_to_rejects_offsite_targets() {
        assert_eq!(safe_return_to(Some("/cart")), "/cart");
        assert_eq!(safe_return_to(Some("//evil.example")), "/");
        assert_eq!(safe_return_to(Some("https://evil.example")), "/");
        assert_eq!(safe_return_to(Some("/\\evil")), "/");
        assert_eq!(safe_return_to(None), "/");
    }
}
