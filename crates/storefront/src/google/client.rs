//! Google OAuth client.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::GoogleOAuthConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Errors from the Google OAuth flow.
#[derive(Debug, Error)]
pub enum GoogleOAuthError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token exchange or userinfo request was rejected.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// Google did not return a verified email.
    #[error("Google account has no verified email")]
    MissingEmail,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// The userinfo fields used to find or create an account.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
}

impl GoogleProfile {
    /// Display name, falling back to the email's local part.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Google user".to_string())
    }
}

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    inner: Arc<GoogleOAuthClientInner>,
}

struct GoogleOAuthClientInner {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
}

impl GoogleOAuthClient {
    /// Create a new Google OAuth client.
    ///
    /// # Errors
    ///
    /// Returns `GoogleOAuthError::Http` if the HTTP client cannot be built.
    pub fn new(config: &GoogleOAuthConfig) -> Result<Self, GoogleOAuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            inner: Arc::new(GoogleOAuthClientInner {
                client,
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            }),
        })
    }

    /// Authorization URL to redirect the user to.
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{AUTHORIZE_URL}?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            scope=openid%20email%20profile&\
            state={}&\
            prompt=select_account",
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code and fetch the user's profile.
    ///
    /// # Errors
    ///
    /// Returns `GoogleOAuthError::OAuth` if Google rejects the code or the
    /// token, and `GoogleOAuthError::MissingEmail` for unverified accounts.
    #[instrument(skip(self, code))]
    pub async fn fetch_profile(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<GoogleProfile, GoogleOAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.inner.client.post(TOKEN_URL).form(&params).send().await?;
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GoogleOAuthError::OAuth(format!("Token exchange failed: {text}")));
        }
        let token: TokenResponse = response.json().await?;

        let response = self
            .inner
            .client
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GoogleOAuthError::OAuth(format!("Userinfo request failed: {text}")));
        }
        let profile: GoogleProfile = response.json().await?;

        if profile.email.is_none() || profile.email_verified == Some(false) {
            return Err(GoogleOAuthError::MissingEmail);
        }
        Ok(profile)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> GoogleOAuthClient {
        GoogleOAuthClient::new(&GoogleOAuthConfig {
            client_id: "client-123.apps.googleusercontent.com".to_string(),
            client_secret: SecretString::from("secret"),
        })
        .unwrap()
    }

    #[test]
    fn test_authorization_url_encodes_params() {
        let url = client().authorization_url("http://localhost:3000/auth/google/callback", "st&ate");
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=client-123.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=st%26ate"));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let profile: GoogleProfile =
            serde_json::from_str(r#"{"email":"mai@example.com","name":"  "}"#).unwrap();
        assert_eq!(profile.display_name(), "mai");

        let profile: GoogleProfile =
            serde_json::from_str(r#"{"email":"mai@example.com","name":"Mai Tran"}"#).unwrap();
        assert_eq!(profile.display_name(), "Mai Tran");
    }
}
