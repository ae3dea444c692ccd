//! Configuration module for the Asra runtime.
//!
//! Loading is layered through figment (see [`ConfigLoader`]); the result is
//! checked by [`validate_config`] before the client is built from it.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    AsraConfig, CredentialsConfig, EventsConfig, LogFormat, LogOutput, LogRotation,
    LoggingConfig, LoggingLevel, SpanEventConfig,
};
pub use validation::validate_config;
