//! # Asra Framework
//!
//! Everything between the handler definition files on disk and the listeners
//! on the gateway's buses.
//!
//! - [`EventDiscovery`] lists the definition files of each category directory.
//! - [`HandlerLoader`] parses a definition file and builds its handler through
//!   the [`HandlerCatalog`].
//! - [`EventRegistry`] binds handlers to buses and supports per-event reload and
//!   bulk teardown.
//! - [`EmbedBuilder`] and [`BotLogger`] format what the bot says.
//!
//! Handler kinds are contributed to [`HANDLER_KINDS`] with `linkme`, which is
//! re-exported so downstream crates need not depend on it directly.

pub mod builtin;
pub mod catalog;
pub mod discovery;
pub mod embed;
pub mod error;
pub mod loader;
pub mod logger;
pub mod registry;

pub use builtin::LogEventHandler;
pub use catalog::{
    HANDLER_KINDS, HandlerCatalog, HandlerContext, HandlerFactory, HandlerKind, HandlerSpec,
};
pub use discovery::{DEFAULT_HANDLER_PATTERN, DiscoveredFiles, EventDiscovery};
pub use embed::{
    ColorKey, Embed, EmbedAuthor, EmbedBuilder, EmbedColors, EmbedField, EmbedFooter, EmbedMedia,
    EmbedTimestamp,
};
pub use error::{DiscoveryError, DiscoveryResult, LoadError, LoadResult};
pub use loader::{HandlerLoader, LoadedHandler};
pub use logger::{BotLogger, LogLevel};
pub use registry::{EventRegistry, HandlerDescriptor};

pub use linkme;
