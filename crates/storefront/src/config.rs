//! Storefront cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JEWELLERY_API_BASE_URL` - Backend API root (e.g., `http://localhost:8081/api`)
//!
//! ## Optional
//! - `JEWELLERY_CURRENCY` - Display currency code (default: LKR)
//! - `JEWELLERY_HTTP_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)
//! - `JEWELLERY_PLACEHOLDER_IMAGE` - Image for lines without one (default: images/placeholder1.jpg)
//! - `JEWELLERY_CHECKOUT_PATH` - Where checkout navigates (default: checkout.html)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use jewellery_core::CurrencyCode;
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PLACEHOLDER_IMAGE: &str = "images/placeholder1.jpg";
const DEFAULT_CHECKOUT_PATH: &str = "checkout.html";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront cart configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Cart API configuration
    pub api: CartApiConfig,
    /// Cart panel display configuration
    pub display: DisplayConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., production, staging)
    pub sentry_environment: Option<String>,
}

/// Backend cart API configuration.
#[derive(Debug, Clone)]
pub struct CartApiConfig {
    /// API root; the cart resource lives at `{base_url}/cart`
    pub base_url: Url,
    /// Timeout applied to every cart request
    pub timeout: Duration,
}

impl CartApiConfig {
    /// Create an API configuration with the default timeout.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// The cart resource URL, without a trailing slash.
    #[must_use]
    pub fn cart_url(&self) -> String {
        format!("{}/cart", self.base_url.as_str().trim_end_matches('/'))
    }
}

/// How the cart panel presents prices and links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Fixed display currency
    pub currency: CurrencyCode,
    /// Image used for lines the server sent without one
    pub placeholder_image: String,
    /// Checkout page the panel links to
    pub checkout_path: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::default(),
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
            checkout_path: DEFAULT_CHECKOUT_PATH.to_string(),
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

        let base_url = parse_api_root(&get_required_env("JEWELLERY_API_BASE_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("JEWELLERY_API_BASE_URL".to_string(), e))?;
        let timeout = parse_timeout(&get_env_or_default(
            "JEWELLERY_HTTP_TIMEOUT_SECS",
            &DEFAULT_TIMEOUT_SECS.to_string(),
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("JEWELLERY_HTTP_TIMEOUT_SECS".to_string(), e))?;

        let currency = get_env_or_default("JEWELLERY_CURRENCY", CurrencyCode::default().code())
            .parse::<CurrencyCode>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("JEWELLERY_CURRENCY".to_string(), e.to_string())
            })?;

        Ok(Self {
            api: CartApiConfig { base_url, timeout },
            display: DisplayConfig {
                currency,
                placeholder_image: get_env_or_default(
                    "JEWELLERY_PLACEHOLDER_IMAGE",
                    DEFAULT_PLACEHOLDER_IMAGE,
                ),
                checkout_path: get_env_or_default("JEWELLERY_CHECKOUT_PATH", DEFAULT_CHECKOUT_PATH),
            },
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse the API root. Only absolute http(s) URLs are accepted.
fn parse_api_root(value: &str) -> Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme {other:?}")),
    }
}

/// Parse a timeout in whole seconds; zero is rejected.
fn parse_timeout(value: &str) -> Result<Duration, String> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err("timeout must be at least 1 second".to_string()),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_url_without_trailing_slash() {
        let config = CartApiConfig::new(parse_api_root("http://localhost:8081/api").unwrap());
        assert_eq!(config.cart_url(), "http://localhost:8081/api/cart");
    }

    #[test]
    fn test_cart_url_with_trailing_slash() {
        let config = CartApiConfig::new(parse_api_root("http://localhost:8081/api/").unwrap());
        assert_eq!(config.cart_url(), "http://localhost:8081/api/cart");
    }

    #[test]
    fn test_parse_api_root_rejects_non_http() {
        assert!(parse_api_root("ftp://example.com/api").is_err());
        assert!(parse_api_root("not a url").is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("5").unwrap(), Duration::from_secs(5));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn test_display_defaults() {
        let display = DisplayConfig::default();
        assert_eq!(display.currency, CurrencyCode::LKR);
        assert_eq!(display.placeholder_image, "images/placeholder1.jpg");
        assert_eq!(display.checkout_path, "checkout.html");
    }
}
