//! Error types for the PayOS client.

use thiserror::Error;

/// Errors that can occur when talking to PayOS.
#[derive(Debug, Error)]
pub enum PayOsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// PayOS answered with a non-success code.
    #[error("API error ({code}): {desc}")]
    Api {
        /// PayOS result code (`"00"` is success).
        code: String,
        /// Human-readable description from PayOS.
        desc: String,
    },

    /// The order cannot be turned into a payment request.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payos_error_display() {
        let err = PayOsError::Api {
            code: "20".to_string(),
            desc: "Thông tin truyền lên không đúng".to_string(),
        };
        assert_eq!(err.to_string(), "API error (20): Thông tin truyền lên không đúng");

        let err = PayOsError::InvalidOrder("order has no items".to_string());
        assert_eq!(err.to_string(), "invalid order: order has no items");
    }
}
