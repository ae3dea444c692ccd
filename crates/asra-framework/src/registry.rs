//! The event registry.
//!
//! Maps event names to the handler currently bound for them and keeps the
//! buses in sync with that map: every registered descriptor owns exactly one
//! listener on the bus selected by its category.
//!
//! The map lives behind a `parking_lot::Mutex` that is only held for the
//! synchronous map and bus updates, never across an `.await`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use asra_core::{BoxedHandler, Category, EventBuses, ListenerId, handler_listener};
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::discovery::DiscoveredFiles;
use crate::error::{LoadError, LoadResult};
use crate::loader::{HandlerLoader, LoadedHandler};

// =============================================================================
// HandlerDescriptor
// =============================================================================

/// A handler together with the metadata needed to bind, reload and unbind it.
pub struct HandlerDescriptor {
    event_name: String,
    category: Category,
    kind: &'static str,
    source: PathBuf,
    handler: BoxedHandler,
    listener: Option<ListenerId>,
}

impl HandlerDescriptor {
    /// Creates an unregistered descriptor.
    pub fn new(
        category: Category,
        kind: &'static str,
        source: impl Into<PathBuf>,
        handler: BoxedHandler,
    ) -> Self {
        Self {
            event_name: handler.event_name().to_string(),
            category,
            kind,
            source: source.into(),
            handler,
            listener: None,
        }
    }

    /// Event the handler responds to.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Bus category.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Catalog kind the handler was built from.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Definition file the handler was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The handler instance.
    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    /// Listener attached for this descriptor. `None` until registered.
    pub fn listener(&self) -> Option<ListenerId> {
        self.listener
    }
}

impl From<LoadedHandler> for HandlerDescriptor {
    fn from(loaded: LoadedHandler) -> Self {
        Self::new(
            loaded.kind.category,
            loaded.kind.name,
            loaded.spec.path,
            loaded.handler,
        )
    }
}

impl std::fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("event_name", &self.event_name)
            .field("category", &self.category)
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// EventRegistry
// =============================================================================

/// Event name → active [`HandlerDescriptor`].
pub struct EventRegistry {
    buses: EventBuses,
    loader: HandlerLoader,
    entries: Mutex<HashMap<String, Arc<HandlerDescriptor>>>,
}

impl EventRegistry {
    /// Creates an empty registry binding to `buses`.
    pub fn new(buses: EventBuses, loader: HandlerLoader) -> Self {
        Self {
            buses,
            loader,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The buses handlers are bound to.
    pub fn buses(&self) -> &EventBuses {
        &self.buses
    }

    /// The loader used for initial loads and reloads.
    pub fn loader(&self) -> &HandlerLoader {
        &self.loader
    }

    /// Registers `descriptor` under its event name and attaches its listener.
    ///
    /// An empty event name is logged and ignored (`false`). A descriptor
    /// already registered under the same name is replaced and its listener
    /// detached.
    pub fn register(&self, descriptor: HandlerDescriptor) -> bool {
        if descriptor.event_name.is_empty() {
            warn!(
                source = %descriptor.source.display(),
                kind = descriptor.kind,
                "Handler has no event name, skipping"
            );
            return false;
        }

        let mut entries = self.entries.lock();
        self.attach(&mut entries, descriptor);
        true
    }

    /// Returns the descriptor registered for `event_name`.
    pub fn lookup(&self, event_name: &str) -> Option<Arc<HandlerDescriptor>> {
        self.entries.lock().get(event_name).cloned()
    }

    /// Loads and registers every file of a discovery pass.
    ///
    /// All files load concurrently and every load runs to completion. The
    /// first failure in discovery order is returned; handlers loaded before
    /// or alongside it stay registered. Returns the number of handlers
    /// registered by this pass.
    pub async fn load_all(&self, files: DiscoveredFiles) -> LoadResult<usize> {
        let category = files.category();
        let paths = files.collect::<Result<Vec<_>, _>>().inspect_err(|e| {
            error!(%category, error = %e, "Event discovery failed");
        })?;

        debug!(%category, files = paths.len(), "Loading handler files");

        let results = join_all(paths.iter().map(|path| self.load_one(category, path))).await;

        let mut registered = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(true) => registered += 1,
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(%category, registered, "Handlers loaded");
                Ok(registered)
            }
        }
    }

    async fn load_one(&self, category: Category, path: &Path) -> LoadResult<bool> {
        let loaded = self.loader.load(path).await?;
        if loaded.category() != category {
            warn!(
                path = %path.display(),
                kind = loaded.kind.name,
                directory = %category,
                bound = %loaded.category(),
                "Handler kind category differs from its directory, binding by kind"
            );
        }

        let handler = loaded.handler.clone();
        if !self.register(loaded.into()) {
            return Ok(false);
        }

        let event = handler.event_name().to_string();
        handler
            .on_load()
            .await
            .map_err(|source| LoadError::OnLoad { event, source })
            .inspect_err(|e| error!(path = %path.display(), error = %e, "Handler on_load failed"))?;
        Ok(true)
    }

    /// Rebuilds the handler registered for `event_name` from its source file.
    ///
    /// Returns `false` when nothing is registered under that name or when the
    /// reload fails. A failed reload leaves the previous handler registered
    /// and attached.
    pub async fn reload(&self, event_name: &str) -> bool {
        let Some(current) = self.lookup(event_name) else {
            debug!(event = event_name, "Reload requested for unknown event");
            return false;
        };

        match self.try_reload(&current).await {
            Ok(()) => {
                info!(
                    event = event_name,
                    source = %current.source.display(),
                    "Handler reloaded"
                );
                true
            }
            Err(e) => {
                error!(event = event_name, error = %e, "Handler reload failed, keeping previous handler");
                false
            }
        }
    }

    async fn try_reload(&self, current: &Arc<HandlerDescriptor>) -> LoadResult<()> {
        let loaded = self.loader.load(&current.source).await?;

        if loaded.category() != current.category {
            return Err(LoadError::CategoryChanged {
                event: current.event_name.clone(),
                from: current.category,
                to: loaded.category(),
            });
        }
        if loaded.handler.event_name() != current.event_name {
            return Err(LoadError::EventRenamed {
                event: current.event_name.clone(),
                found: loaded.handler.event_name().to_string(),
            });
        }

        loaded
            .handler
            .on_load()
            .await
            .map_err(|source| LoadError::OnLoad {
                event: current.event_name.clone(),
                source,
            })?;

        // The entry may have been replaced or torn down while the new handler
        // was loading; only the snapshot taken at the start may be swapped.
        let mut entries = self.entries.lock();
        let still_current = entries
            .get(&current.event_name)
            .is_some_and(|entry| Arc::ptr_eq(entry, current));
        if !still_current {
            return Err(LoadError::Superseded {
                event: current.event_name.clone(),
            });
        }

        self.attach(&mut entries, loaded.into());
        Ok(())
    }

    /// Detaches every listener and empties the registry.
    ///
    /// Returns the number of handlers removed.
    pub fn teardown(&self) -> usize {
        let drained: Vec<_> = self.entries.lock().drain().map(|(_, d)| d).collect();
        for descriptor in &drained {
            self.detach(descriptor);
        }
        info!(removed = drained.len(), "Event registry torn down");
        drained.len()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Registered event names, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    fn attach(
        &self,
        entries: &mut HashMap<String, Arc<HandlerDescriptor>>,
        mut descriptor: HandlerDescriptor,
    ) {
        let bus = self.buses.for_category(descriptor.category);
        let id = bus.on(
            &descriptor.event_name,
            handler_listener(descriptor.handler.clone()),
        );
        descriptor.listener = Some(id);

        debug!(
            event = %descriptor.event_name,
            category = %descriptor.category,
            bus = bus.name(),
            listener = %id,
            "Handler attached"
        );

        if let Some(previous) = entries.insert(descriptor.event_name.clone(), Arc::new(descriptor))
        {
            debug!(
                event = %previous.event_name,
                source = %previous.source.display(),
                "Replacing registered handler"
            );
            self.detach(&previous);
        }
    }

    fn detach(&self, descriptor: &HandlerDescriptor) {
        if let Some(id) = descriptor.listener {
            self.buses
                .for_category(descriptor.category)
                .off(&descriptor.event_name, id);
        }
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("events", &self.event_names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use asra_core::{BoxError, EventHandler, EventPayload};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    use crate::catalog::{HandlerCatalog, HandlerContext, HandlerKind, HandlerSpec};
    use crate::discovery::{DEFAULT_HANDLER_PATTERN, EventDiscovery};

    static TALLY: AtomicUsize = AtomicUsize::new(0);
    static RELEASE_ON_LOAD: AtomicBool = AtomicBool::new(false);

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct StubSettings {
        fail_on_load: bool,
        /// Holds `on_load` until `RELEASE_ON_LOAD` is set.
        hold_on_load: bool,
        tally: bool,
    }

    struct Stub {
        event: String,
        settings: StubSettings,
    }

    #[async_trait]
    impl EventHandler for Stub {
        fn event_name(&self) -> &str {
            &self.event
        }

        async fn on_load(&self) -> Result<(), BoxError> {
            if self.settings.fail_on_load {
                return Err("refusing to load".into());
            }
            while self.settings.hold_on_load && !RELEASE_ON_LOAD.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
            Ok(())
        }

        async fn on_trigger(&self, _payload: EventPayload) -> Result<(), BoxError> {
            if self.settings.tally {
                TALLY.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    fn stub(spec: &HandlerSpec, _context: &HandlerContext) -> Result<BoxedHandler, BoxError> {
        Ok(Arc::new(Stub {
            event: spec.event.clone(),
            settings: spec.settings()?,
        }))
    }

    struct Fixture {
        root: tempfile::TempDir,
        registry: EventRegistry,
        discovery: EventDiscovery,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            fs::create_dir_all(root.path().join("client")).unwrap();
            fs::create_dir_all(root.path().join("transport")).unwrap();

            let catalog = HandlerCatalog::new()
                .with(HandlerKind::new("stub", Category::ClientEvent, stub))
                .with(HandlerKind::new(
                    "transport_stub",
                    Category::TransportEvent,
                    stub,
                ));
            let registry = EventRegistry::new(
                EventBuses::new(),
                HandlerLoader::new(Arc::new(catalog), HandlerContext::default()),
            );
            let discovery = EventDiscovery::new(
                root.path().join("client"),
                root.path().join("transport"),
                DEFAULT_HANDLER_PATTERN,
            )
            .unwrap();

            Self {
                root,
                registry,
                discovery,
            }
        }

        fn write(&self, category: &str, file: &str, content: &str) -> PathBuf {
            let path = self.root.path().join(category).join(file);
            fs::write(&path, content).unwrap();
            path
        }

        async fn load(&self, category: Category) -> LoadResult<usize> {
            self.registry
                .load_all(self.discovery.discover(category).unwrap())
                .await
        }

        async fn load_both(&self) {
            self.load(Category::ClientEvent).await.unwrap();
            self.load(Category::TransportEvent).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_handlers_bind_to_their_category_bus() {
        let fx = Fixture::new();
        fx.write("client", "ready.toml", "handler = \"stub\"\nevent = \"ready\"");
        fx.write(
            "transport",
            "rate.toml",
            "handler = \"transport_stub\"\nevent = \"rateLimited\"",
        );
        fx.load_both().await;

        assert_eq!(fx.registry.event_names(), vec!["rateLimited", "ready"]);

        let ready = fx.registry.lookup("ready").unwrap();
        assert_eq!(ready.category(), Category::ClientEvent);
        assert_eq!(ready.kind(), "stub");
        assert!(ready.listener().is_some());
        assert_eq!(fx.registry.buses().client.listener_count("ready"), 1);
        assert_eq!(fx.registry.buses().transport.listener_count("ready"), 0);

        let rate = fx.registry.lookup("rateLimited").unwrap();
        assert_eq!(rate.category(), Category::TransportEvent);
        assert_eq!(fx.registry.buses().transport.listener_count("rateLimited"), 1);
        assert_eq!(fx.registry.buses().client.listener_count("rateLimited"), 0);
    }

    #[tokio::test]
    async fn test_empty_event_name_is_never_registered() {
        let fx = Fixture::new();
        fx.write("client", "anonymous.toml", "handler = \"stub\"");
        fx.write("client", "ready.toml", "handler = \"stub\"\nevent = \"ready\"");

        assert_eq!(fx.load(Category::ClientEvent).await.unwrap(), 1);
        assert_eq!(fx.registry.len(), 1);
        assert!(fx.registry.lookup("").is_none());
        assert_eq!(fx.registry.buses().total_listeners(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_name() {
        let fx = Fixture::new();
        let handler = stub(&HandlerSpec::new("stub", ""), &HandlerContext::default()).unwrap();
        let registered = fx.registry.register(HandlerDescriptor::new(
            Category::ClientEvent,
            "stub",
            "inline",
            handler,
        ));

        assert!(!registered);
        assert!(fx.registry.is_empty());
        assert_eq!(fx.registry.buses().total_listeners(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_names_keep_one_listener() {
        let fx = Fixture::new();
        fx.write("client", "a.toml", "handler = \"stub\"\nevent = \"ready\"");
        fx.write("client", "b.toml", "handler = \"stub\"\nevent = \"ready\"");

        fx.load(Category::ClientEvent).await.unwrap();

        assert_eq!(fx.registry.len(), 1);
        assert_eq!(fx.registry.buses().client.listener_count("ready"), 1);
        assert_eq!(
            fx.registry.buses().client.emit("ready", json!({})).await,
            1
        );
    }

    #[tokio::test]
    async fn test_load_failure_surfaces_after_siblings_complete() {
        let fx = Fixture::new();
        fx.write("client", "ready.toml", "handler = \"stub\"\nevent = \"ready\"");
        fx.write("client", "bad.toml", "handler = \"nope\"");

        let result = fx.load(Category::ClientEvent).await;
        assert!(matches!(result, Err(LoadError::UnknownKind { .. })));
        assert!(fx.registry.lookup("ready").is_some());
    }

    #[tokio::test]
    async fn test_on_load_failure_fails_the_batch() {
        let fx = Fixture::new();
        fx.write(
            "client",
            "ready.toml",
            "handler = \"stub\"\nevent = \"ready\"\n[settings]\nfail_on_load = true",
        );

        let result = fx.load(Category::ClientEvent).await;
        assert!(matches!(result, Err(LoadError::OnLoad { event, .. }) if event == "ready"));
    }

    #[tokio::test]
    async fn test_category_follows_kind_not_directory() {
        let fx = Fixture::new();
        fx.write(
            "client",
            "raw.toml",
            "handler = \"transport_stub\"\nevent = \"raw\"",
        );
        fx.load(Category::ClientEvent).await.unwrap();

        let raw = fx.registry.lookup("raw").unwrap();
        assert_eq!(raw.category(), Category::TransportEvent);
        assert_eq!(fx.registry.buses().transport.listener_count("raw"), 1);
    }

    #[tokio::test]
    async fn test_reload_unknown_event() {
        let fx = Fixture::new();
        fx.write("client", "ready.toml", "handler = \"stub\"\nevent = \"ready\"");
        fx.load_both().await;

        assert!(!fx.registry.reload("nonexistent").await);
        assert_eq!(fx.registry.len(), 1);
        assert_eq!(fx.registry.buses().total_listeners(), 1);
    }

    #[tokio::test]
    async fn test_reload_swaps_listener() {
        let fx = Fixture::new();
        fx.write("client", "ready.toml", "handler = \"stub\"\nevent = \"ready\"");
        fx.load_both().await;
        let before = fx.registry.lookup("ready").unwrap();

        assert!(fx.registry.reload("ready").await);

        let after = fx.registry.lookup("ready").unwrap();
        assert!(!Arc::ptr_eq(before.handler(), after.handler()));
        assert_ne!(before.listener(), after.listener());
        assert_eq!(fx.registry.len(), 1);
        assert_eq!(fx.registry.buses().client.listener_count("ready"), 1);
        assert!(
            !fx.registry
                .buses()
                .client
                .off("ready", before.listener().unwrap())
        );
    }

    #[tokio::test]
    async fn test_reload_picks_up_file_changes() {
        let fx = Fixture::new();
        let path = fx.write("client", "tally.toml", "handler = \"stub\"\nevent = \"tally\"");
        fx.load_both().await;

        fs::write(
            &path,
            "handler = \"stub\"\nevent = \"tally\"\n[settings]\ntally = true",
        )
        .unwrap();
        assert!(fx.registry.reload("tally").await);

        let before = TALLY.load(Ordering::SeqCst);
        assert_eq!(fx.registry.buses().client.emit("tally", json!({})).await, 1);
        assert_eq!(TALLY.load(Ordering::SeqCst), before + 1);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_handler() {
        let fx = Fixture::new();
        let path = fx.write("client", "ready.toml", "handler = \"stub\"\nevent = \"ready\"");
        fx.load_both().await;
        let before = fx.registry.lookup("ready").unwrap();

        for broken in [
            "handler = ",
            "handler = \"stub\"\nevent = \"ready\"\n[settings]\nfail_on_load = true",
            "handler = \"stub\"\nevent = \"renamed\"",
            "handler = \"transport_stub\"\nevent = \"ready\"",
        ] {
            fs::write(&path, broken).unwrap();
            assert!(!fx.registry.reload("ready").await, "{broken}");

            let current = fx.registry.lookup("ready").unwrap();
            assert!(Arc::ptr_eq(&before, &current));
            assert_eq!(fx.registry.buses().client.listener_count("ready"), 1);
            assert_eq!(fx.registry.buses().transport.listener_count("ready"), 0);
        }
    }

    #[tokio::test]
    async fn test_reload_after_source_removed() {
        let fx = Fixture::new();
        let path = fx.write("client", "ready.toml", "handler = \"stub\"\nevent = \"ready\"");
        fx.load_both().await;

        fs::remove_file(path).unwrap();
        assert!(!fx.registry.reload("ready").await);
        assert!(fx.registry.lookup("ready").is_some());
    }

    #[tokio::test]
    async fn test_teardown_detaches_everything() {
        let fx = Fixture::new();
        fx.write("client", "ready.toml", "handler = \"stub\"\nevent = \"ready\"");
        fx.write("client", "guild.toml", "handler = \"stub\"\nevent = \"guildCreate\"");
        fx.write(
            "transport",
            "rate.toml",
            "handler = \"transport_stub\"\nevent = \"rateLimited\"",
        );
        fx.load_both().await;
        assert_eq!(fx.registry.buses().total_listeners(), 3);

        assert_eq!(fx.registry.teardown(), 3);
        assert!(fx.registry.is_empty());
        assert_eq!(fx.registry.buses().client.total_listeners(), 0);
        assert_eq!(fx.registry.buses().transport.total_listeners(), 0);
        assert_eq!(fx.registry.teardown(), 0);
    }

    #[tokio::test]
    async fn test_teardown_during_reload_wins() {
        let fx = Fixture::new();
        let path = fx.write("client", "ready.toml", "handler = \"stub\"\nevent = \"ready\"");
        fx.load_both().await;

        fs::write(
            &path,
            "handler = \"stub\"\nevent = \"ready\"\n[settings]\nhold_on_load = true",
        )
        .unwrap();

        let (reloaded, removed) = tokio::join!(fx.registry.reload("ready"), async {
            for _ in 0..50 {
                tokio::task::yield_now().await;
            }
            let removed = fx.registry.teardown();
            RELEASE_ON_LOAD.store(true, Ordering::SeqCst);
            removed
        });

        assert!(!reloaded);
        assert_eq!(removed, 1);
        assert!(fx.registry.is_empty());
        assert_eq!(fx.registry.buses().total_listeners(), 0);
    }

    #[tokio::test]
    async fn test_reload_of_replaced_entry_is_rejected() {
        let fx = Fixture::new();
        fx.write("client", "ready.toml", "handler = \"stub\"\nevent = \"ready\"");
        fx.load_both().await;
        let stale = fx.registry.lookup("ready").unwrap();

        let replacement =
            stub(&HandlerSpec::new("stub", "ready"), &HandlerContext::default()).unwrap();
        assert!(fx.registry.register(HandlerDescriptor::new(
            Category::ClientEvent,
            "stub",
            "inline",
            replacement,
        )));
        let current = fx.registry.lookup("ready").unwrap();

        let result = fx.registry.try_reload(&stale).await;
        assert!(matches!(result, Err(LoadError::Superseded { event }) if event == "ready"));
        assert!(Arc::ptr_eq(&current, &fx.registry.lookup("ready").unwrap()));
        assert_eq!(fx.registry.buses().client.listener_count("ready"), 1);
    }
}
