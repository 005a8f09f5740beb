//! PayOS payment-link client.
//!
//! Orders paid online are sent to PayOS as payment requests. The buyer is
//! redirected to the returned `checkoutUrl`; PayOS later calls our webhook
//! with a signed `data` object which is verified with [`verify_signature`].
//!
//! Both directions are signed with HMAC-SHA256 keyed by the merchant
//! checksum key:
//!
//! - Requests sign `amount=..&cancelUrl=..&description=..&orderCode=..&returnUrl=..`
//! - Webhooks sign every field of `data`, sorted by key

mod client;
mod error;
mod signature;
pub mod types;

pub use client::{PayOsClient, order_code_for};
pub use error::PayOsError;
pub use signature::{canonical_data, constant_time_eq, sign, verify_signature};
