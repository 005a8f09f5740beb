//! Gemini API client.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::error::{ApiErrorResponse, GeminiError};
use super::types::{GenerateRequest, GenerateResponse};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Appended when the model hit its output limit.
const TRUNCATION_NOTE: &str = "\n\n(Note: this answer may have been cut short.)";

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    inner: Arc<GeminiClientInner>,
}

struct GeminiClientInner {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::Http` if the HTTP client cannot be built.
    pub fn new(api_key: SecretString, model: &str) -> Result<Self, GeminiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(GeminiClientInner {
                client,
                api_key,
                model: model.to_string(),
            }),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    /// Generate a reply to `user` under the `system` instructions.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::RateLimited` on 429, `GeminiError::Unauthorized`
    /// on 401/403, `GeminiError::Api` on other failures and
    /// `GeminiError::EmptyResponse` if no text came back.
    #[instrument(skip(self, system, user), fields(model = %self.inner.model))]
    pub async fn generate(&self, system: &str, user: &str) -> Result<String, GeminiError> {
        let url = format!("{GEMINI_API_BASE}/{}:generateContent", self.inner.model);

        let response = self
            .inner
            .client
            .post(url)
            .header("x-goog-api-key", self.inner.api_key.expose_secret())
            .json(&GenerateRequest::new(system, user))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GeminiError::Parse(format!("Failed to parse response: {e}")))?;

        let text = parsed.first_text().ok_or(GeminiError::EmptyResponse)?;
        if parsed.is_truncated() {
            tracing::warn!("Gemini response truncated at max tokens");
            return Ok(format!("{text}{TRUNCATION_NOTE}"));
        }
        Ok(text.to_string())
    }

    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> GeminiError {
        match status {
            reqwest::StatusCode::TOO_MANY_REQUESTS => return GeminiError::RateLimited,
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return GeminiError::Unauthorized("Invalid API key".to_string());
            }
            _ => {}
        }

        match response.text().await {
            Ok(body) => {
                let message = serde_json::from_str::<ApiErrorResponse>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                GeminiError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
            Err(e) => GeminiError::Http(e),
        }
    }
}
