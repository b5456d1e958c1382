//! Delivery backend REST client.
//!
//! # Architecture
//!
//! - Plain REST with JSON bodies; authenticated calls carry a bearer
//!   token per request (the token is session state, not client state)
//! - One `reqwest` client shared behind an `Arc`
//! - No retries at this layer; callers decide whether a failure is
//!   surfaced, rolled back, or retried on the next poll tick
//!
//! # Example
//!
//! ```rust,ignore
//! use gobi_eats_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config)?;
//! let lines = client.fetch_cart(&user_id, &token).await?;
//! ```

mod cart;
mod orders;
mod qpay;
pub mod types;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::StorefrontConfig;

/// Errors that can occur when calling the delivery backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Client for the delivery backend REST API.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let base_url = config
            .backend_url
            .as_str()
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            inner: Arc::new(BackendClientInner { client, base_url }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.base_url)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&SecretString>,
    ) -> Result<T, BackendError> {
        let mut request = self.inner.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        Self::read_json(request.send().await?).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&SecretString>,
    ) -> Result<T, BackendError> {
        let mut request = self.inner.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        Self::read_json(request.send().await?).await
    }

    /// POST whose response body is irrelevant beyond the status code.
    pub(crate) async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&SecretString>,
    ) -> Result<(), BackendError> {
        let mut request = self.inner.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        Self::check_status(request.send().await?).await?;
        Ok(())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let response = Self::check_status(response).await?;

        // Read the body as text first for better parse diagnostics
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "failed to parse backend response"
            );
            BackendError::Parse(e.to_string())
        })
    }
}
