//! Error types shared across the Asra crates.

use thiserror::Error;

/// Type-erased error returned by handler hooks and factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by a [`Gateway`](crate::Gateway) implementation.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The platform rejected the credential.
    #[error("invalid credential: {reason}")]
    InvalidCredential {
        /// Reason reported by the platform.
        reason: String,
    },

    /// Login failed for a reason other than the credential.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// The gateway has already been destroyed.
    #[error("gateway has been destroyed")]
    Destroyed,
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
