//! Client error types.

use asra_core::GatewayError;
use asra_framework::{DiscoveryError, LoadError};
use thiserror::Error;

use crate::client::ClientState;
use crate::config::ConfigError;
use crate::credentials::MissingCredential;

/// Errors surfaced by the client lifecycle.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A category directory could not be scanned.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// A handler file failed to load.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The login token for the active mode is missing.
    #[error(transparent)]
    MissingCredential(#[from] MissingCredential),

    /// The gateway refused the login.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The operation is not allowed in the current state.
    #[error("Cannot {operation} a client in the {state} state")]
    InvalidState {
        operation: &'static str,
        state: ClientState,
    },
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
