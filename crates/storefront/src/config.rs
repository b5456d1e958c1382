//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GOBI_BACKEND_URL` - Origin of the delivery backend REST API
//!
//! ## Optional
//! - `GOBI_STORAGE_DIR` - Client-side storage directory (default: .gobi-eats)
//! - `GOBI_DELIVERY_FEE` - Delivery fee in tögrög, added at checkout (default: 3000)
//! - `GOBI_QPAY_POLL_SECS` - Interactive invoice poll interval (default: 5)
//! - `GOBI_ORDER_POLL_SECS` - Background order poll interval (default: 300)
//! - `GOBI_QPAY_POLL_TIMEOUT_SECS` - Maximum time to poll one invoice (default: 900)
//! - `GOBI_HTTP_TIMEOUT_SECS` - Per-request HTTP timeout (default: 15)

use std::path::PathBuf;
use std::time::Duration;

use gobi_eats_core::Price;
use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

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
    /// Origin of the delivery backend REST API
    pub backend_url: Url,
    /// Directory for client-side persistent storage
    pub storage_dir: PathBuf,
    /// Delivery fee added on top of the cart total at checkout
    pub delivery_fee: Price,
    /// Invoice poll interval for the interactive payment dialog
    pub qpay_poll_interval: Duration,
    /// Invoice poll interval for the background order-detail view
    pub order_poll_interval: Duration,
    /// Maximum time to keep polling one invoice
    pub qpay_poll_timeout: Duration,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any
    /// variable fails to parse. Poll intervals must be positive.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend_url = parse_backend_url(
            "GOBI_BACKEND_URL",
            &get_required_env("GOBI_BACKEND_URL")?,
        )?;
        let storage_dir = PathBuf::from(get_env_or_default("GOBI_STORAGE_DIR", ".gobi-eats"));
        let delivery_fee = parse_fee(
            "GOBI_DELIVERY_FEE",
            &get_env_or_default("GOBI_DELIVERY_FEE", "3000"),
        )?;
        let qpay_poll_interval = parse_positive_secs(
            "GOBI_QPAY_POLL_SECS",
            &get_env_or_default("GOBI_QPAY_POLL_SECS", "5"),
        )?;
        let order_poll_interval = parse_positive_secs(
            "GOBI_ORDER_POLL_SECS",
            &get_env_or_default("GOBI_ORDER_POLL_SECS", "300"),
        )?;
        let qpay_poll_timeout = parse_positive_secs(
            "GOBI_QPAY_POLL_TIMEOUT_SECS",
            &get_env_or_default("GOBI_QPAY_POLL_TIMEOUT_SECS", "900"),
        )?;
        let http_timeout = parse_positive_secs(
            "GOBI_HTTP_TIMEOUT_SECS",
            &get_env_or_default("GOBI_HTTP_TIMEOUT_SECS", "15"),
        )?;

        Ok(Self {
            backend_url,
            storage_dir,
            delivery_fee,
            qpay_poll_interval,
            order_poll_interval,
            qpay_poll_timeout,
            http_timeout,
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

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and validate the backend origin URL.
fn parse_backend_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = raw
        .parse::<Url>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http(s) origin".to_string(),
        ));
    }
    Ok(url)
}

/// Parse a non-negative tögrög amount.
fn parse_fee(key: &str, raw: &str) -> Result<Price, ConfigError> {
    let amount = raw
        .parse::<Decimal>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if amount < Decimal::ZERO {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(Price::new(amount))
}

/// Parse a strictly positive duration in whole seconds.
fn parse_positive_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
