//! Turns handler definition files into live handlers.

use std::path::Path;
use std::sync::Arc;

use asra_core::{BoxedHandler, Category};
use figment::Figment;
use figment::providers::{Format, Toml};
use tracing::{debug, error};

use crate::catalog::{HandlerCatalog, HandlerContext, HandlerKind, HandlerSpec};
use crate::error::{LoadError, LoadResult};

/// A freshly constructed handler and where it came from.
pub struct LoadedHandler {
    /// Catalog entry the handler was built from.
    pub kind: HandlerKind,
    /// Parsed definition file.
    pub spec: HandlerSpec,
    /// The handler instance.
    pub handler: BoxedHandler,
}

impl LoadedHandler {
    /// Category of the handler, taken from its kind.
    pub fn category(&self) -> Category {
        self.kind.category
    }
}

/// Reads definition files and instantiates them through the catalog.
#[derive(Debug, Clone)]
pub struct HandlerLoader {
    catalog: Arc<HandlerCatalog>,
    context: HandlerContext,
}

impl HandlerLoader {
    /// Creates a loader over `catalog`. Every factory call receives `context`.
    pub fn new(catalog: Arc<HandlerCatalog>, context: HandlerContext) -> Self {
        Self { catalog, context }
    }

    /// The catalog kinds are resolved against.
    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    /// Context handed to every factory.
    pub fn context(&self) -> &HandlerContext {
        &self.context
    }

    /// Reads and parses a definition file.
    pub async fn read_spec(path: &Path) -> LoadResult<HandlerSpec> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LoadError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut spec: HandlerSpec = Figment::from(Toml::string(&content))
            .extract()
            .map_err(|e| LoadError::Malformed {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;
        spec.path = path.to_path_buf();
        Ok(spec)
    }

    /// Reads `path`, resolves its kind, and constructs the handler.
    pub async fn load(&self, path: &Path) -> LoadResult<LoadedHandler> {
        let result = self.try_load(path).await;
        if let Err(e) = &result {
            error!(path = %path.display(), error = %e, "Failed to load handler file");
        }
        result
    }

    async fn try_load(&self, path: &Path) -> LoadResult<LoadedHandler> {
        let spec = Self::read_spec(path).await?;

        let kind = self
            .catalog
            .get(&spec.handler)
            .ok_or_else(|| LoadError::UnknownKind {
                path: path.to_path_buf(),
                kind: spec.handler.clone(),
            })?;

        let handler = kind
            .instantiate(&spec, &self.context)
            .map_err(|source| LoadError::Construct {
                path: path.to_path_buf(),
                kind: kind.name,
                source,
            })?;

        debug!(
            path = %path.display(),
            kind = kind.name,
            category = %kind.category,
            event = handler.event_name(),
            "Handler constructed"
        );

        Ok(LoadedHandler {
            kind,
            spec,
            handler,
        })
    }
}
