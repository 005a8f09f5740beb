//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span)
//! 3. Request ID
//! 4. Security headers and CSP nonce
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Rate limiters are attached to the `/auth` and `/api` routers only.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, safe_return_to, set_current_user,
    wants_json,
};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::{CspNonce, security_headers_middleware};
pub use session::create_session_layer;
