//! Request ID middleware for request tracing and correlation.
//!
//! An inbound `x-request-id` from a proxy is reused when it looks sane,
//! otherwise a UUID v4 is generated. The ID is recorded on the current span,
//! tagged in Sentry, stored in request extensions and echoed in the response.

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderValue, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_INBOUND_LEN: usize = 128;

/// The current request's ID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Accept an upstream ID only if it is short, printable ASCII.
fn inbound_id(value: Option<&HeaderValue>) -> Option<String> {
    let id = value?.to_str().ok()?.trim();
    let valid = !id.is_empty()
        && id.len() <= MAX_INBOUND_LEN
        && id.bytes().all(|b| b.is_ascii_graphic());
    valid.then(|| id.to_string())
}

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id =
        inbound_id(request.headers().get(REQUEST_ID_HEADER)).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or_else(|| Self(String::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_id_accepted_when_sane() {
        let value = HeaderValue::from_static("cf-8a1b2c3d");
        assert_eq!(inbound_id(Some(&value)).as_deref(), Some("cf-8a1b2c3d"));
    }

    #[test]
    fn test_inbound_id_rejected_when_odd() {
        assert_eq!(inbound_id(None), None);
        assert_eq!(inbound_id(Some(&HeaderValue::from_static("has space"))), None);
        let long = HeaderValue::from_str(&"a".repeat(MAX_INBOUND_LEN + 1)).ok();
        assert_eq!(inbound_id(long.as_ref()), None);
    }
}
