//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::gemini::{GeminiClient, GeminiError};
use crate::google::{GoogleOAuthClient, GoogleOAuthError};
use crate::imagekit::{ImageKitClient, ImageKitError};
use crate::payos::{PayOsClient, PayOsError};
use crate::services::chat::{ProductContextCache, product_context_cache};

/// Error building the API clients held in [`AppState`].
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("PayOS client: {0}")]
    PayOs(#[from] PayOsError),
    #[error("ImageKit client: {0}")]
    ImageKit(#[from] ImageKitError),
    #[error("Gemini client: {0}")]
    Gemini(#[from] GeminiError),
    #[error("Google OAuth client: {0}")]
    Google(#[from] GoogleOAuthError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections, configuration and the
/// external API clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    payos: PayOsClient,
    imagekit: ImageKitClient,
    gemini: Option<GeminiClient>,
    google: Option<GoogleOAuthClient>,
    chat_context: ProductContextCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Google sign-in and the chat assistant are only wired up when their
    /// credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let payos = PayOsClient::new(&config.payos, &config.base_url)?;
        let imagekit = ImageKitClient::new(&config.imagekit)?;
        let gemini = config
            .gemini
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .map(|key| GeminiClient::new(key.clone(), &config.gemini.model))
            .transpose()?;
        let google = config
            .google
            .as_ref()
            .map(GoogleOAuthClient::new)
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                payos,
                imagekit,
                gemini,
                google,
                chat_context: product_context_cache(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn payos(&self) -> &PayOsClient {
        &self.inner.payos
    }

    #[must_use]
    pub fn imagekit(&self) -> &ImageKitClient {
        &self.inner.imagekit
    }

    /// The Gemini client, if `GEMINI_API_KEY` is set.
    #[must_use]
    pub fn gemini(&self) -> Option<&GeminiClient> {
        self.inner.gemini.as_ref()
    }

    /// The Google OAuth client, if Google sign-in is configured.
    #[must_use]
    pub fn google(&self) -> Option<&GoogleOAuthClient> {
        self.inner.google.as_ref()
    }

    #[must_use]
    pub fn chat_context(&self) -> &ProductContextCache {
        &self.inner.chat_context
    }
}
