//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `RECAPTCHA_SITE_KEY` - reCAPTCHA site key rendered on the login form
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `BACKEND_API_URL` - REST backend base URL (default: <https://localhost:4000>)
//! - `BACKEND_ACCEPT_INVALID_CERTS` - Accept self-signed backend certificates (default: false)
//! - `KHALTI_PUBLIC_KEY` - Khalti widget public key; online payment is disabled without it
//! - `KHALTI_TEST_MODE` - Cap the charged amount for the sandbox (default: true)
//! - `KHALTI_TEST_CEILING` - Sandbox amount cap in rupees (default: 200)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.1)
//! - `LOG_FORMAT` - `json` for one JSON object per log line (read by the binary)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use samaan_kinam_core::Price;
use thiserror::Error;
use url::Url;

const DEFAULT_BACKEND_URL: &str = "https://localhost:4000";
const DEFAULT_TEST_CEILING: i64 = 200;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// REST backend configuration
    pub backend: BackendConfig,
    /// reCAPTCHA site key for the login form
    pub recaptcha_site_key: String,
    /// Payment gateway configuration
    pub payment: PaymentConfig,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// REST backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL every API path is resolved against
    pub url: Url,
    /// Accept self-signed certificates (local development backend)
    pub accept_invalid_certs: bool,
}

/// Khalti payment widget configuration.
///
/// Implements `Debug` manually so the key never lands in logs verbatim.
#[derive(Clone)]
pub struct PaymentConfig {
    /// Widget public key. `None` disables online payment.
    pub khalti_public_key: Option<String>,
    /// Sandbox mode caps the charged amount at `test_ceiling`.
    pub test_mode: bool,
    /// Largest amount the sandbox accepts.
    pub test_ceiling: Price,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field(
                "khalti_public_key",
                &self.khalti_public_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("test_mode", &self.test_mode)
            .field("test_ceiling", &self.test_ceiling)
            .finish()
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            khalti_public_key: None,
            test_mode: true,
            test_ceiling: Price::from_rupees(DEFAULT_TEST_CEILING),
        }
    }
}

/// Sentry configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    /// DSN; `None` disables error tracking
    pub dsn: Option<String>,
    /// Environment name reported with events
    pub environment: Option<String>,
    /// Fraction of errors sent
    pub sample_rate: f32,
    /// Fraction of transactions traced
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.1,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let recaptcha_site_key = get_required_env("RECAPTCHA_SITE_KEY")?;

        Ok(Self {
            host,
            port,
            base_url,
            backend: BackendConfig::from_env()?,
            recaptcha_site_key,
            payment: PaymentConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (controls secure cookies).
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_env_or_default("BACKEND_API_URL", DEFAULT_BACKEND_URL);
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_API_URL".to_string(), e.to_string()))?;

        Ok(Self {
            url,
            accept_invalid_certs: parse_bool_env("BACKEND_ACCEPT_INVALID_CERTS", false)?,
        })
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let ceiling: Decimal = parse_env("KHALTI_TEST_CEILING", "200")?;
        if ceiling <= Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                "KHALTI_TEST_CEILING".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            khalti_public_key: get_optional_env("KHALTI_PUBLIC_KEY"),
            test_mode: parse_bool_env("KHALTI_TEST_MODE", true)?,
            test_ceiling: Price::new(ceiling),
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_optional_env(key) {
        None => Ok(default),
        Some(value) => parse_bool(&value).ok_or_else(|| {
            ConfigError::InvalidEnvVar(key.to_string(), format!("expected a boolean, got {value:?}"))
        }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
