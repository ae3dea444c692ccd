//! The extended bot client.
//!
//! Owns the gateway connection, the event registry and the bot's presentation
//! context, and drives them through one lifecycle:
//!
//! ```text
//! Uninitialized ──initialize──▶ Loading ──▶ Ready ──destroy──▶ ShuttingDown ──▶ Destroyed
//!                                  │                               ▲
//!                                  └────────▶ Failed ──destroy─────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use asra_core::LocalGateway;
//! use asra_runtime::{AsraClient, config::load_config};
//!
//! let client = AsraClient::builder(Arc::new(LocalGateway::default()))
//!     .config(load_config()?)
//!     .build()?;
//! client.run().await?;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use asra_core::{Category, Gateway};
use asra_framework::{
    BotLogger, EventDiscovery, EventRegistry, HandlerCatalog, HandlerContext, HandlerDescriptor,
    HandlerLoader,
};
use parking_lot::Mutex;
use tokio::signal;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{AsraConfig, validate_config};
use crate::credentials::CredentialSource;
use crate::error::{ClientError, ClientResult};

/// Lifecycle state of an [`AsraClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
    ShuttingDown,
    Destroyed,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Loading => write!(f, "Loading"),
            Self::Ready => write!(f, "Ready"),
            Self::Failed => write!(f, "Failed"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
            Self::Destroyed => write!(f, "Destroyed"),
        }
    }
}

/// The bot client.
pub struct AsraClient {
    gateway: Arc<dyn Gateway>,
    registry: EventRegistry,
    discovery: EventDiscovery,
    credentials: CredentialSource,
    logger: BotLogger,
    state: Mutex<ClientState>,
}

impl AsraClient {
    /// Starts building a client on top of `gateway`.
    pub fn builder(gateway: Arc<dyn Gateway>) -> ClientBuilder {
        ClientBuilder::new(gateway)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        *self.state.lock()
    }

    /// The event registry.
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// The bot's log presentation context.
    pub fn logger(&self) -> &BotLogger {
        &self.logger
    }

    /// The underlying connection.
    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    /// Returns the handler registered for `event_name`.
    pub fn event_handler(&self, event_name: &str) -> Option<Arc<HandlerDescriptor>> {
        self.registry.lookup(event_name)
    }

    /// Reloads the handler registered for `event_name` from its file.
    ///
    /// Only a `Ready` client reloads; any other state returns `false`.
    /// A missing or failed reload is also `false` and keeps the previous
    /// handler active.
    pub async fn reload_event(&self, event_name: &str) -> bool {
        let state = self.state();
        if state != ClientState::Ready {
            warn!(event = event_name, %state, "Reload rejected, client is not ready");
            return false;
        }
        self.registry.reload(event_name).await
    }

    /// Loads every handler of both categories, then logs in.
    ///
    /// Only valid once, from `Uninitialized`. Any failure leaves the client
    /// `Failed`; handlers registered before the failure stay registered.
    #[instrument(skip_all, name = "initialize")]
    pub async fn initialize(&self) -> ClientResult<()> {
        self.transition(
            "initialize",
            &[ClientState::Uninitialized],
            ClientState::Loading,
        )?;

        match self.load_and_login().await {
            Ok(()) => {
                self.set_state(ClientState::Ready);
                info!(handlers = self.registry.len(), "Client ready");
                Ok(())
            }
            Err(e) => {
                self.set_state(ClientState::Failed);
                error!(error = %e, "Client initialization failed");
                Err(e)
            }
        }
    }

    async fn load_and_login(&self) -> ClientResult<()> {
        let (client, transport) = tokio::join!(
            self.load_category(Category::ClientEvent),
            self.load_category(Category::TransportEvent),
        );
        client?;
        transport?;

        let credential = self.credentials.resolve().inspect_err(|e| {
            error!(phase = "login", error = %e, "No login token available");
        })?;

        self.gateway
            .login(credential.expose())
            .await
            .inspect_err(|e| error!(phase = "login", error = %e, "Gateway login failed"))?;
        Ok(())
    }

    async fn load_category(&self, category: Category) -> ClientResult<usize> {
        let files = self.discovery.discover(category).inspect_err(|e| {
            error!(%category, phase = "discovery", error = %e, "Event discovery failed");
        })?;

        let loaded = self.registry.load_all(files).await.inspect_err(|e| {
            error!(%category, phase = "loading", error = %e, "Event loading failed");
        })?;
        Ok(loaded)
    }

    /// Detaches every handler and releases the gateway.
    ///
    /// Valid from `Ready` or `Failed`.
    #[instrument(skip_all, name = "destroy")]
    pub async fn destroy(&self) -> ClientResult<()> {
        self.transition(
            "destroy",
            &[ClientState::Ready, ClientState::Failed],
            ClientState::ShuttingDown,
        )?;

        let removed = self.registry.teardown();
        self.gateway.destroy().await;
        self.set_state(ClientState::Destroyed);

        info!(removed, "Client destroyed");
        Ok(())
    }

    /// Initializes, waits for Ctrl+C or SIGTERM, then destroys.
    pub async fn run(&self) -> ClientResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Initializes, waits for `shutdown`, then destroys.
    ///
    /// A failed initialization is still destroyed before the error returns.
    pub async fn run_until<F>(&self, shutdown: F) -> ClientResult<()>
    where
        F: Future<Output = ()>,
    {
        if let Err(e) = self.initialize().await {
            if self.state() == ClientState::Failed
                && let Err(destroy_err) = self.destroy().await
            {
                warn!(error = %destroy_err, "Cleanup after failed initialization failed");
            }
            return Err(e);
        }

        info!("Asra client is running. Press Ctrl+C to stop.");
        shutdown.await;
        self.destroy().await
    }

    fn transition(
        &self,
        operation: &'static str,
        from: &[ClientState],
        to: ClientState,
    ) -> ClientResult<()> {
        let mut state = self.state.lock();
        if !from.contains(&*state) {
            warn!(operation, state = %*state, "Rejected client state transition");
            return Err(ClientError::InvalidState {
                operation,
                state: *state,
            });
        }
        debug!(from = %*state, to = %to, "Client state changed");
        *state = to;
        Ok(())
    }

    fn set_state(&self, to: ClientState) {
        let mut state = self.state.lock();
        debug!(from = %*state, to = %to, "Client state changed");
        *state = to;
    }
}

impl fmt::Debug for AsraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsraClient")
            .field("state", &self.state())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// ClientBuilder
// =============================================================================

/// Builder for [`AsraClient`].
pub struct ClientBuilder {
    gateway: Arc<dyn Gateway>,
    config: AsraConfig,
    catalog: Option<HandlerCatalog>,
    credentials: Option<CredentialSource>,
}

impl ClientBuilder {
    fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            config: AsraConfig::default(),
            catalog: None,
            credentials: None,
        }
    }

    /// Uses `config` instead of the defaults.
    pub fn config(mut self, config: AsraConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolves handler kinds against `catalog` instead of
    /// [`HandlerCatalog::linked`].
    pub fn catalog(mut self, catalog: HandlerCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Reads the login token from `credentials` instead of the process
    /// environment.
    pub fn credentials(mut self, credentials: CredentialSource) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Validates the configuration and builds the client.
    pub fn build(self) -> ClientResult<AsraClient> {
        validate_config(&self.config)?;

        let events = &self.config.events;
        let discovery = EventDiscovery::new(
            events.client_dir.clone(),
            events.transport_dir.clone(),
            &events.pattern,
        )?;

        let catalog = self.catalog.unwrap_or_else(HandlerCatalog::linked);
        debug!(kinds = ?catalog.names(), "Handler catalog ready");

        let logger = BotLogger::new(self.config.embed);
        let registry = EventRegistry::new(
            self.gateway.buses(),
            HandlerLoader::new(Arc::new(catalog), HandlerContext::new(logger.clone())),
        );
        let credentials = self
            .credentials
            .unwrap_or_else(|| CredentialSource::from_env(self.config.credentials.clone()));

        Ok(AsraClient {
            gateway: self.gateway,
            registry,
            discovery,
            credentials,
            logger,
            state: Mutex::new(ClientState::Uninitialized),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    use std::sync::atomic::{AtomicU32, Ordering};

    use asra_core::{BoxError, BoxedHandler, EventHandler, EventPayload, LocalGateway};
    use asra_framework::{EmbedBuilder, HandlerKind, HandlerSpec, LoadError};
    use async_trait::async_trait;
    use serde_json::json;

    use crate::credentials::DeploymentMode;

    struct Fixture {
        root: tempfile::TempDir,
        gateway: Arc<LocalGateway>,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            fs::create_dir_all(root.path().join("client")).unwrap();
            fs::create_dir_all(root.path().join("transport")).unwrap();
            Self {
                root,
                gateway: Arc::new(LocalGateway::new("tester")),
            }
        }

        fn write(&self, dir: &str, file: &str, content: &str) {
            fs::write(self.root.path().join(dir).join(file), content).unwrap();
        }

        fn config(&self) -> AsraConfig {
            let mut config = AsraConfig::default();
            config.events.client_dir = self.root.path().join("client");
            config.events.transport_dir = self.root.path().join("transport");
            config
        }

        fn client(&self, vars: &[(&str, &str)]) -> AsraClient {
            self.builder(self.config(), vars).build().unwrap()
        }

        fn builder(&self, config: AsraConfig, vars: &[(&str, &str)]) -> ClientBuilder {
            let vars: HashMap<String, String> = vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let credentials = CredentialSource::with_lookup(config.credentials.clone(), move |n| {
                vars.get(n).cloned()
            });

            AsraClient::builder(self.gateway.clone())
                .config(config)
                .credentials(credentials)
        }

        fn with_handlers(self) -> Self {
            self.write("client", "ready.toml", "handler = \"log_event\"\nevent = \"ready\"");
            self.write(
                "client",
                "guild.toml",
                "handler = \"log_event\"\nevent = \"guildCreate\"",
            );
            self.write(
                "transport",
                "rate.toml",
                "handler = \"log_transport_event\"\nevent = \"rateLimited\"",
            );
            self
        }
    }

    #[tokio::test]
    async fn test_initialize_registers_and_logs_in() {
        let fx = Fixture::new().with_handlers();
        let client = fx.client(&[("DEVELOPMENT_TOKEN", "dev")]);

        client.initialize().await.unwrap();

        assert_eq!(client.state(), ClientState::Ready);
        assert_eq!(
            client.registry().event_names(),
            vec!["guildCreate", "rateLimited", "ready"]
        );
        let ready = client.event_handler("ready").unwrap();
        assert_eq!(ready.category(), Category::ClientEvent);
        assert_eq!(client.gateway().buses().client.listener_count("ready"), 1);
        assert_eq!(
            client.gateway().buses().transport.listener_count("rateLimited"),
            1
        );
        assert_eq!(fx.gateway.login_attempts(), 1);
        assert!(fx.gateway.is_connected());
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_login() {
        let fx = Fixture::new().with_handlers();
        let client = fx.client(&[("ENVIRONMENT", "production"), ("DEVELOPMENT_TOKEN", "dev")]);

        let err = client.initialize().await.unwrap_err();
        match err {
            ClientError::MissingCredential(missing) => {
                assert_eq!(missing.mode, DeploymentMode::Production);
                assert_eq!(missing.variable, "PRODUCTION_TOKEN");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(client.state(), ClientState::Failed);
        assert_eq!(fx.gateway.login_attempts(), 0);
        assert_eq!(client.registry().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_directory_fails_initialization() {
        let fx = Fixture::new();
        fs::remove_dir(fx.root.path().join("transport")).unwrap();
        let client = fx.client(&[("DEVELOPMENT_TOKEN", "dev")]);

        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, ClientError::Discovery(_)));
        assert_eq!(client.state(), ClientState::Failed);
        assert_eq!(fx.gateway.login_attempts(), 0);
    }

    #[tokio::test]
    async fn test_bad_handler_file_fails_initialization() {
        let fx = Fixture::new().with_handlers();
        fx.write("transport", "broken.toml", "handler = \"does_not_exist\"");
        let client = fx.client(&[("DEVELOPMENT_TOKEN", "dev")]);

        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, ClientError::Load(LoadError::UnknownKind { .. })));
        assert_eq!(client.state(), ClientState::Failed);
        assert_eq!(fx.gateway.login_attempts(), 0);
    }

    #[tokio::test]
    async fn test_invalid_transitions() {
        let fx = Fixture::new();
        let client = fx.client(&[("DEVELOPMENT_TOKEN", "dev")]);

        assert!(matches!(
            client.destroy().await,
            Err(ClientError::InvalidState {
                operation: "destroy",
                state: ClientState::Uninitialized
            })
        ));

        client.initialize().await.unwrap();
        assert!(matches!(
            client.initialize().await,
            Err(ClientError::InvalidState {
                operation: "initialize",
                state: ClientState::Ready
            })
        ));

        client.destroy().await.unwrap();
        assert!(client.destroy().await.is_err());
    }

    #[tokio::test]
    async fn test_destroy_tears_everything_down() {
        let fx = Fixture::new().with_handlers();
        let client = fx.client(&[("DEVELOPMENT_TOKEN", "dev")]);
        client.initialize().await.unwrap();

        client.destroy().await.unwrap();

        assert_eq!(client.state(), ClientState::Destroyed);
        assert!(client.registry().is_empty());
        assert_eq!(client.gateway().buses().total_listeners(), 0);
        assert!(fx.gateway.is_destroyed());
    }

    #[tokio::test]
    async fn test_destroy_after_failure() {
        let fx = Fixture::new().with_handlers();
        let client = fx.client(&[]);

        assert!(client.initialize().await.is_err());
        client.destroy().await.unwrap();
        assert_eq!(client.state(), ClientState::Destroyed);
        assert_eq!(client.gateway().buses().total_listeners(), 0);
    }

    #[tokio::test]
    async fn test_reload_event_delegates() {
        let fx = Fixture::new().with_handlers();
        let client = fx.client(&[("DEVELOPMENT_TOKEN", "dev")]);
        client.initialize().await.unwrap();

        let before = client.event_handler("ready").unwrap();
        assert!(client.reload_event("ready").await);
        assert!(!client.reload_event("nonexistent").await);

        let after = client.event_handler("ready").unwrap();
        assert_ne!(before.listener(), after.listener());
        assert_eq!(client.registry().len(), 3);
        assert_eq!(client.gateway().buses().client.listener_count("ready"), 1);
    }

    #[tokio::test]
    async fn test_reload_event_requires_ready() {
        let fx = Fixture::new().with_handlers();
        let client = fx.client(&[("DEVELOPMENT_TOKEN", "dev")]);
        assert!(!client.reload_event("ready").await);

        client.initialize().await.unwrap();
        client.destroy().await.unwrap();

        assert!(!client.reload_event("ready").await);
        assert!(client.registry().is_empty());
        assert_eq!(client.gateway().buses().total_listeners(), 0);
    }

    #[tokio::test]
    async fn test_run_until_initializes_and_destroys() {
        let fx = Fixture::new().with_handlers();
        let client = fx.client(&[("DEVELOPMENT_TOKEN", "dev")]);

        client.run_until(async {}).await.unwrap();

        assert_eq!(client.state(), ClientState::Destroyed);
        assert!(fx.gateway.is_destroyed());
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let fx = Fixture::new();
        let mut config = fx.config();
        config.events.pattern = "[".to_string();

        let result = AsraClient::builder(fx.gateway.clone()).config(config).build();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_logger_uses_configured_palette() {
        let fx = Fixture::new();
        let mut config = fx.config();
        config.embed.red = 0x123456;

        let client = AsraClient::builder(fx.gateway.clone())
            .config(config)
            .build()
            .unwrap();
        assert_eq!(client.logger().palette().red, 0x123456);
    }

    static WELCOME_COLOR: AtomicU32 = AtomicU32::new(0);

    struct Welcome {
        logger: BotLogger,
    }

    #[async_trait]
    impl EventHandler for Welcome {
        fn event_name(&self) -> &str {
            "ready"
        }

        async fn on_trigger(&self, _payload: EventPayload) -> Result<(), BoxError> {
            let embed = EmbedBuilder::success(self.logger.palette())
                .title("welcome")
                .build();
            WELCOME_COLOR.store(embed.color.unwrap_or_default(), Ordering::SeqCst);
            Ok(())
        }
    }

    fn welcome(_spec: &HandlerSpec, context: &HandlerContext) -> Result<BoxedHandler, BoxError> {
        Ok(Arc::new(Welcome {
            logger: context.logger().clone(),
        }))
    }

    #[tokio::test]
    async fn test_handlers_build_embeds_with_configured_palette() {
        let fx = Fixture::new();
        fx.write("client", "ready.toml", "handler = \"welcome\"");
        let mut config = fx.config();
        config.embed.green = 0x0A0B0C;

        let client = fx
            .builder(config, &[("DEVELOPMENT_TOKEN", "dev")])
            .catalog(HandlerCatalog::new().with(HandlerKind::new(
                "welcome",
                Category::ClientEvent,
                welcome,
            )))
            .build()
            .unwrap();
        client.initialize().await.unwrap();

        fx.gateway.buses().client.emit("ready", json!({})).await;
        assert_eq!(WELCOME_COLOR.load(Ordering::SeqCst), 0x0A0B0C);
    }
}
