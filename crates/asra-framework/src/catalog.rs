//! The handler catalog: a factory table keyed by handler kind.
//!
//! Handler definition files never contain code. They name a *kind*, and the
//! catalog maps that name to a [`HandlerKind`]: the kind's [`Category`] plus a
//! plain factory function. Reloading a handler is therefore "re-read the file,
//! look the kind up again, call the factory".
//!
//! Kinds reach the catalog either explicitly ([`HandlerCatalog::register`]) or
//! by contributing to the [`HANDLER_KINDS`] distributed slice from any crate
//! linked into the binary:
//!
//! ```rust,ignore
//! use asra::framework::{HANDLER_KINDS, HandlerKind, linkme::distributed_slice};
//!
//! #[distributed_slice(HANDLER_KINDS)]
//! #[linkme(crate = asra::framework::linkme)]
//! static READY: HandlerKind = HandlerKind::new("ready_logger", Category::ClientEvent, ready);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use asra_core::{BoxError, BoxedHandler, Category};
use linkme::distributed_slice;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::logger::BotLogger;

// =============================================================================
// HandlerSpec
// =============================================================================

/// The parsed contents of one handler definition file.
///
/// ```toml
/// handler = "log_event"
/// event = "guildCreate"
///
/// [settings]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerSpec {
    /// File this spec was read from.
    #[serde(skip)]
    pub path: PathBuf,

    /// Name of the handler kind in the catalog.
    pub handler: String,

    /// Event name handed to the factory. Kinds with a fixed event ignore it.
    #[serde(default)]
    pub event: String,

    /// Free-form kind-specific settings.
    #[serde(default = "empty_settings")]
    pub settings: Value,
}

fn empty_settings() -> Value {
    Value::Object(Map::new())
}

impl HandlerSpec {
    /// Creates a spec in memory, mostly useful for tests and built-in wiring.
    pub fn new(handler: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            path: PathBuf::new(),
            handler: handler.into(),
            event: event.into(),
            settings: empty_settings(),
        }
    }

    /// Replaces the settings table.
    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    /// Source file of this spec.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deserializes the settings table into `T`.
    ///
    /// Use `#[serde(default)]` on `T` to make every setting optional.
    pub fn settings<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(&self.settings)
    }
}

// =============================================================================
// HandlerKind
// =============================================================================

/// State shared with every factory call.
///
/// Built once by whoever owns the [`HandlerLoader`](crate::HandlerLoader) and
/// handed to each factory, so handlers present themselves the way the client
/// is configured to.
#[derive(Debug, Clone, Default)]
pub struct HandlerContext {
    logger: BotLogger,
}

impl HandlerContext {
    /// Creates a context around the client's logger.
    pub fn new(logger: BotLogger) -> Self {
        Self { logger }
    }

    /// The client's log presentation context.
    pub fn logger(&self) -> &BotLogger {
        &self.logger
    }
}

/// Factory producing a live handler from its spec.
pub type HandlerFactory = fn(&HandlerSpec, &HandlerContext) -> Result<BoxedHandler, BoxError>;

/// A static, `Copy` catalog entry.
///
/// The category is a property of the kind, so every handler built from one
/// kind binds to the same bus.
#[derive(Clone, Copy)]
pub struct HandlerKind {
    /// Name that handler files refer to.
    pub name: &'static str,
    /// Bus the kind's handlers bind to.
    pub category: Category,
    /// Factory function.
    pub create: HandlerFactory,
}

impl HandlerKind {
    /// Creates a kind. `const` so it can back a `static`.
    pub const fn new(name: &'static str, category: Category, create: HandlerFactory) -> Self {
        Self {
            name,
            category,
            create,
        }
    }

    /// Runs the factory.
    #[inline]
    pub fn instantiate(
        &self,
        spec: &HandlerSpec,
        context: &HandlerContext,
    ) -> Result<BoxedHandler, BoxError> {
        (self.create)(spec, context)
    }
}

impl fmt::Debug for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerKind")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Kinds contributed at link time.
#[distributed_slice]
pub static HANDLER_KINDS: [HandlerKind];

// =============================================================================
// HandlerCatalog
// =============================================================================

/// Name → [`HandlerKind`] lookup table.
#[derive(Debug, Clone, Default)]
pub struct HandlerCatalog {
    kinds: HashMap<&'static str, HandlerKind>,
}

impl HandlerCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding every kind in [`HANDLER_KINDS`].
    pub fn linked() -> Self {
        let mut catalog = Self::new();
        for kind in HANDLER_KINDS.iter() {
            catalog.register(*kind);
        }
        catalog
    }

    /// Adds a kind, returning the one it replaced.
    pub fn register(&mut self, kind: HandlerKind) -> Option<HandlerKind> {
        let previous = self.kinds.insert(kind.name, kind);
        if previous.is_some() {
            warn!(kind = kind.name, "Duplicate handler kind, last registration wins");
        }
        previous
    }

    /// Adds a kind (builder style).
    pub fn with(mut self, kind: HandlerKind) -> Self {
        self.register(kind);
        self
    }

    /// Looks a kind up by name.
    pub fn get(&self, name: &str) -> Option<HandlerKind> {
        self.kinds.get(name).copied()
    }

    /// Number of kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Names of all kinds, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.kinds.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
