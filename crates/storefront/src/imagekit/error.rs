//! Error types for the ImageKit client.

use thiserror::Error;

/// Errors that can occur when talking to ImageKit.
#[derive(Debug, Error)]
pub enum ImageKitError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// ImageKit returned a non-success status.
    #[error("upload failed with status {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),
}
