//! ImageKit upload API client.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha1::Sha1;
use tracing::instrument;

use crate::config::ImageKitConfig;

use super::error::ImageKitError;
use super::url;

const UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";
const DELETE_URL: &str = "https://upload.imagekit.io/api/v1/files/delete";

/// Upload response fields we use.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(default)]
    file_id: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    file_path: String,
}

/// A file stored on ImageKit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Public URL on the configured endpoint.
    pub url: String,
    /// ImageKit's internal file id.
    pub file_id: String,
}

/// ImageKit client.
#[derive(Clone)]
pub struct ImageKitClient {
    inner: Arc<ImageKitClientInner>,
}

struct ImageKitClientInner {
    client: reqwest::Client,
    url_endpoint: String,
    public_key: String,
    private_key: SecretString,
}

impl ImageKitClient {
    /// Create a new ImageKit client.
    ///
    /// # Errors
    ///
    /// Returns `ImageKitError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ImageKitConfig) -> Result<Self, ImageKitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            inner: Arc::new(ImageKitClientInner {
                client,
                url_endpoint: config.url_endpoint.trim_end_matches('/').to_string(),
                public_key: config.public_key.clone(),
                private_key: config.private_key.clone(),
            }),
        })
    }

    /// The configured URL endpoint, without a trailing slash.
    #[must_use]
    pub fn url_endpoint(&self) -> &str {
        &self.inner.url_endpoint
    }

    /// Upload a file into `folder`.
    ///
    /// The returned URL is rebuilt on our endpoint from `filePath` so custom
    /// CDN domains never leak into stored URLs.
    ///
    /// # Errors
    ///
    /// Returns `ImageKitError::Api` on a non-2xx status and
    /// `ImageKitError::Http`/`Parse` on transport failures.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        folder: &str,
    ) -> Result<UploadedImage, ImageKitError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("fileName", file_name.to_string());
        if !folder.is_empty() {
            form = form.text("folder", folder.to_string());
        }

        let response = self
            .inner
            .client
            .post(UPLOAD_URL)
            .basic_auth(self.inner.private_key.expose_secret(), Some(""))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ImageKitError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| ImageKitError::Parse(format!("failed to parse upload response: {e}")))?;

        let url = if parsed.file_path.is_empty() {
            parsed.url
        } else {
            format!("{}{}", self.inner.url_endpoint, parsed.file_path)
        };

        tracing::info!(file_id = %parsed.file_id, "Image uploaded to ImageKit");

        Ok(UploadedImage {
            url,
            file_id: parsed.file_id,
        })
    }

    /// Delete a file. Returns whether ImageKit accepted the request.
    ///
    /// # Errors
    ///
    /// Returns `ImageKitError::Http` if the request cannot be sent.
    #[instrument(skip(self))]
    pub async fn delete(&self, file_id: &str) -> Result<bool, ImageKitError> {
        let timestamp = Utc::now().timestamp();
        let token = delete_token(
            self.inner.private_key.expose_secret(),
            &self.inner.public_key,
            file_id,
            timestamp,
        );

        let response = self
            .inner
            .client
            .post(DELETE_URL)
            .json(&serde_json::json!({
                "fileId": file_id,
                "publicKey": self.inner.public_key,
                "timestamp": timestamp,
                "token": token,
            }))
            .send()
            .await?;

        Ok(response.status().is_success())
    }

    /// See [`url::image_url`].
    #[must_use]
    pub fn image_url(&self, path_or_url: &str, width: Option<u32>, height: Option<u32>) -> String {
        url::image_url(&self.inner.url_endpoint, path_or_url, width, height)
    }

    /// See [`url::transformed_url`].
    #[must_use]
    pub fn transformed_url(&self, image_id: &str, transformation: &str) -> String {
        url::transformed_url(&self.inner.url_endpoint, image_id, transformation)
    }
}

/// `base64(HMAC-SHA1(private_key, "{timestamp}{public_key}{file_id}"))`.
#[must_use]
pub fn delete_token(private_key: &str, public_key: &str, file_id: &str, timestamp: i64) -> String {
    #[allow(clippy::expect_used)]
    let mut mac = Hmac::<Sha1>::new_from_slice(private_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{timestamp}{public_key}{file_id}").as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_token_is_stable_base64() {
        let a = delete_token("private_test", "public_test", "products/racket.jpg", 1_700_000_000);
        let b = delete_token("private_test", "public_test", "products/racket.jpg", 1_700_000_000);
        assert_eq!(a, b);
        // 20-byte SHA1 digest encodes to 28 base64 characters
        assert_eq!(a.len(), 28);
        assert_ne!(
            a,
            delete_token("private_test", "public_test", "products/racket.jpg", 1_700_000_001)
        );
    }

    #[test]
    fn test_upload_response_parses_camel_case() {
        let parsed: UploadResponse = serde_json::from_str(
            r#"{"fileId":"abc","name":"x.jpg","url":"https://cdn.example.com/products/x.jpg",
                "filePath":"/products/x.jpg","size":10}"#,
        )
        .unwrap();
        assert_eq!(parsed.file_id, "abc");
        assert_eq!(parsed.file_path, "/products/x.jpg");
    }
}
