//! Asra Runtime - configuration, logging and the extended client.
//!
//! This crate provides:
//! - Layered configuration (`AsraConfig`, `ConfigLoader`)
//! - Logging setup over `tracing-subscriber` (`LoggingBuilder`)
//! - Login token selection by deployment mode (`CredentialSource`)
//! - The client lifecycle (`AsraClient`)
//!
//! ```ignore
//! use std::sync::Arc;
//! use asra_core::LocalGateway;
//! use asra_runtime::{AsraClient, config::load_config, logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let client = AsraClient::builder(Arc::new(LocalGateway::default()))
//!         .config(config)
//!         .build()?;
//!
//!     // Run until Ctrl+C
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;

// Re-exports
pub use client::{AsraClient, ClientBuilder, ClientState};
pub use config::{AsraConfig, ConfigError, ConfigLoader, ConfigResult};
pub use credentials::{Credential, CredentialSource, DeploymentMode, MissingCredential};
pub use error::{ClientError, ClientResult};
pub use logging::{LoggingBuilder, SpanEvents};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
