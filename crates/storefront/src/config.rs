//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` or `DATABASE_URL` - `PostgreSQL` connection string
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (payment and OAuth callbacks)
//! - `SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `PAYOS_CLIENT_ID` - PayOS merchant client ID
//! - `PAYOS_API_KEY` - PayOS API key
//! - `PAYOS_CHECKSUM_KEY` - PayOS checksum key used for request and webhook signatures
//! - `IMAGEKIT_URL_ENDPOINT` - ImageKit delivery endpoint (e.g. `https://ik.imagekit.io/shop`)
//! - `IMAGEKIT_PUBLIC_KEY` - ImageKit public key
//! - `IMAGEKIT_PRIVATE_KEY` - ImageKit private key
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `PAYOS_API_URL` - PayOS API base (default: `https://api-merchant.payos.vn`)
//! - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` - enables "Sign in with Google"
//! - `GEMINI_API_KEY` - enables the shopping assistant
//! - `GEMINI_MODEL` - Gemini model name (default: gemini-2.0-flash)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sentry sampling (default: 1.0 / 0.1)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_PAYOS_API_URL: &str = "https://api-merchant.payos.vn";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without a trailing slash
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// PayOS payment link configuration
    pub payos: PayOsConfig,
    /// ImageKit media configuration
    pub imagekit: ImageKitConfig,
    /// Google OAuth client, if "Sign in with Google" is enabled
    pub google: Option<GoogleOAuthConfig>,
    /// Gemini shopping assistant configuration
    pub gemini: GeminiConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. production, staging)
    pub sentry_environment: Option<String>,
    /// Error event sample rate
    pub sentry_sample_rate: f32,
    /// Performance trace sample rate
    pub sentry_traces_sample_rate: f32,
    /// Log output format
    pub log_format: LogFormat,
}

/// PayOS merchant credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PayOsConfig {
    /// API base URL
    pub api_url: String,
    /// Merchant client ID (sent as `x-client-id`)
    pub client_id: String,
    /// API key (sent as `x-api-key`)
    pub api_key: SecretString,
    /// HMAC key for request signatures and webhook verification
    pub checksum_key: SecretString,
}

impl std::fmt::Debug for PayOsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayOsConfig")
            .field("api_url", &self.api_url)
            .field("client_id", &self.client_id)
            .field("api_key", &"[REDACTED]")
            .field("checksum_key", &"[REDACTED]")
            .finish()
    }
}

/// ImageKit account configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ImageKitConfig {
    /// Delivery endpoint, without a trailing slash
    pub url_endpoint: String,
    /// Public key (sent with delete requests)
    pub public_key: String,
    /// Private key (Basic auth and delete-token signing)
    pub private_key: SecretString,
}

impl std::fmt::Debug for ImageKitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageKitConfig")
            .field("url_endpoint", &self.url_endpoint)
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Google OAuth 2.0 web client.
#[derive(Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for GoogleOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Gemini API configuration.
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key; the assistant answers with a fallback message when absent
    pub api_key: Option<SecretString>,
    /// Model name
    pub model: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_base_url("STOREFRONT_BASE_URL")?;
        let session_secret = get_validated_secret("SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SESSION_SECRET")?;

        let payos = PayOsConfig::from_env()?;
        let imagekit = ImageKitConfig::from_env()?;
        let google = GoogleOAuthConfig::from_env()?;
        let gemini = GeminiConfig::from_env();

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);
        let log_format = parse_log_format(get_optional_env("LOG_FORMAT").as_deref());

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            payos,
            imagekit,
            google,
            gemini,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            log_format,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Absolute URL for a path on this storefront.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl PayOsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_env_or_default("PAYOS_API_URL", DEFAULT_PAYOS_API_URL)
                .trim_end_matches('/')
                .to_string(),
            client_id: get_required_env("PAYOS_CLIENT_ID")?,
            api_key: get_required_secret("PAYOS_API_KEY")?,
            checksum_key: get_validated_secret("PAYOS_CHECKSUM_KEY")?,
        })
    }
}

impl ImageKitConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url_endpoint: get_base_url("IMAGEKIT_URL_ENDPOINT")?,
            public_key: get_required_env("IMAGEKIT_PUBLIC_KEY")?,
            private_key: get_validated_secret("IMAGEKIT_PRIVATE_KEY")?,
        })
    }
}

impl GoogleOAuthConfig {
    /// Both variables must be set together; one without the other is an error.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (
            get_optional_env("GOOGLE_CLIENT_ID"),
            get_optional_env("GOOGLE_CLIENT_SECRET"),
        ) {
            (None, None) => Ok(None),
            (Some(client_id), Some(_)) => Ok(Some(Self {
                client_id,
                client_secret: get_validated_secret("GOOGLE_CLIENT_SECRET")?,
            })),
            (Some(_), None) => Err(ConfigError::MissingEnvVar(
                "GOOGLE_CLIENT_SECRET".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("GOOGLE_CLIENT_ID".to_string())),
        }
    }
}

impl GeminiConfig {
    fn from_env() -> Self {
        Self {
            api_key: get_optional_env("GEMINI_API_KEY").map(SecretString::from),
            model: get_env_or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        }
    }
}

fn parse_log_format(value: Option<&str>) -> LogFormat {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    // Fallback to the generic DATABASE_URL shared with the CLI
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get a required URL and strip any trailing slash.
fn get_base_url(key: &str) -> Result<String, ConfigError> {
    let value = get_required_env(key)?;
    let parsed = url::Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
impl StorefrontConfig {
    /// Configuration for unit tests that never touch the network.
    pub(crate) fn for_tests() -> Self {
        Self {
            database_url: SecretString::from("postgres://localhost/tennis_shop_test"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("q8Zr2LmX9vTk4NwP7sJd1HcF6yBg3QeA"),
            payos: PayOsConfig {
                api_url: DEFAULT_PAYOS_API_URL.to_string(),
                client_id: "test-client".to_string(),
                api_key: SecretString::from("test-api-key"),
                checksum_key: SecretString::from("test-checksum-key"),
            },
            imagekit: ImageKitConfig {
                url_endpoint: "https://ik.imagekit.io/tennisshop".to_string(),
                public_key: "public_test".to_string(),
                private_key: SecretString::from("private_test"),
            },
            google: None,
            gemini: GeminiConfig {
                api_key: None,
                model: DEFAULT_GEMINI_MODEL.to_string(),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
            log_format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-checksum-key", "PAYOS_CHECKSUM_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "SESSION_SECRET").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = StorefrontConfig::for_tests().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_absolute_url_joins_without_double_slash() {
        let config = StorefrontConfig::for_tests();
        assert_eq!(
            config.absolute_url("/payment/success/7"),
            "http://localhost:3000/payment/success/7"
        );
        assert_eq!(config.absolute_url("orders"), "http://localhost:3000/orders");
        assert!(!config.is_https());
    }

    #[test]
    fn test_parse_log_format() {
        assert_eq!(parse_log_format(Some("JSON")), LogFormat::Json);
        assert_eq!(parse_log_format(Some("pretty")), LogFormat::Text);
        assert_eq!(parse_log_format(None), LogFormat::Text);
    }

    #[test]
    fn test_payos_config_debug_redacts_secrets() {
        let config = PayOsConfig {
            api_url: DEFAULT_PAYOS_API_URL.to_string(),
            client_id: "client_id_value".to_string(),
            api_key: SecretString::from("super_secret_api_key"),
            checksum_key: SecretString::from("super_secret_checksum"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("client_id_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_key"));
        assert!(!debug_output.contains("super_secret_checksum"));
    }

    #[test]
    fn test_imagekit_and_gemini_debug_redact_keys() {
        let config = StorefrontConfig::for_tests();
        let imagekit = format!("{:?}", config.imagekit);
        assert!(!imagekit.contains("private_test"));
        let gemini = format!(
            "{:?}",
            GeminiConfig {
                api_key: Some(SecretString::from("AIzaSecretValue")),
                model: "gemini-2.0-flash".to_string(),
            }
        );
        assert!(!gemini.contains("AIzaSecretValue"));
        assert!(gemini.contains("gemini-2.0-flash"));
    }
}
