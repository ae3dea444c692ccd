//! Error types for handler discovery and loading.

use std::path::PathBuf;

use asra_core::{BoxError, Category};
use thiserror::Error;

/// Errors raised while scanning a category directory.
///
/// Every variant is fatal for client initialization.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The category directory does not exist.
    #[error("{category} event directory not found: {}", .path.display())]
    MissingDirectory {
        /// Category being discovered.
        category: Category,
        /// Directory that was expected.
        path: PathBuf,
    },

    /// The category directory (or one of its entries) could not be read.
    #[error("failed to read {category} event directory {}: {source}", .path.display())]
    Unreadable {
        /// Category being discovered.
        category: Category,
        /// Directory being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The handler file pattern is not a valid glob.
    #[error("invalid handler file pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Parser error.
        #[source]
        source: globset::Error,
    },
}

/// Errors raised while turning a handler definition file into a handler.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Discovery failed while the batch was being collected.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// The definition file could not be read.
    #[error("failed to read handler file {}: {source}", .path.display())]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The definition file is not a valid handler manifest.
    #[error("malformed handler file {}: {source}", .path.display())]
    Malformed {
        /// File being parsed.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: Box<figment::Error>,
    },

    /// The manifest names a handler kind missing from the catalog.
    #[error("handler file {} refers to unknown handler kind '{kind}'", .path.display())]
    UnknownKind {
        /// File being loaded.
        path: PathBuf,
        /// Kind named by the manifest.
        kind: String,
    },

    /// The handler factory failed.
    #[error("failed to construct handler '{kind}' from {}: {source}", .path.display())]
    Construct {
        /// File being loaded.
        path: PathBuf,
        /// Kind being constructed.
        kind: &'static str,
        /// Factory error.
        #[source]
        source: BoxError,
    },

    /// The handler's `on_load` hook failed.
    #[error("handler for event '{event}' failed to load: {source}")]
    OnLoad {
        /// Event the handler is bound to.
        event: String,
        /// Hook error.
        #[source]
        source: BoxError,
    },

    /// A reload resolved to a handler of another category.
    #[error("reloading '{event}' would move it from the {from} bus to the {to} bus")]
    CategoryChanged {
        /// Event being reloaded.
        event: String,
        /// Category of the registered handler.
        from: Category,
        /// Category of the reloaded handler.
        to: Category,
    },

    /// A reload resolved to a handler for another event.
    #[error("reloading '{event}' produced a handler for '{found}'")]
    EventRenamed {
        /// Event being reloaded.
        event: String,
        /// Event name reported by the reloaded handler.
        found: String,
    },

    /// The entry being reloaded was replaced or torn down before the swap.
    #[error("handler for '{event}' changed while it was being reloaded")]
    Superseded {
        /// Event being reloaded.
        event: String,
    },
}

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;
