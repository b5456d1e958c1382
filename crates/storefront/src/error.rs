//! Unified error handling for the storefront core.
//!
//! Provides a unified `AppError` type over the per-module error enums.
//! Internal detail is logged via `tracing`; what the user sees comes
//! from [`AppError::user_message`] and goes through the notification
//! bus.

use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Application-level error type for the storefront core.
#[derive(Debug, Error)]
pub enum AppError {
    /// Delivery backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Client-side storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration failed to load.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An invariant was violated before any network call was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Client state disagrees with the authoritative store.
    #[error("Cart inconsistency: {0}")]
    Inconsistency(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation requires an authenticated session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    /// The message shown to the user for this error.
    ///
    /// Internal error details are never exposed; validation messages
    /// are written for the user in the first place and pass through.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(_) => "Could not reach the server. Please try again.".to_string(),
            Self::Storage(_) => "Could not save your cart on this device.".to_string(),
            Self::Config(_) => "The app is not configured correctly.".to_string(),
            Self::Validation(message) => message.clone(),
            Self::Inconsistency(_) => {
                "Your cart was out of date and has been refreshed.".to_string()
            }
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(_) => "Please sign in to continue.".to_string(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
