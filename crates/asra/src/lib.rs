//! # Asra
//!
//! A file-driven event handler scaffold for chat bots.
//!
//! ## Architecture
//!
//! ```text
//! events/client/*.toml ──┐                      ┌──▶ client EventBus ──┐
//!                        ├─▶ EventRegistry ─────┤                      ├──▶ Gateway
//! events/transport/*.toml┘   (HandlerCatalog)   └──▶ transport EventBus┘
//! ```
//!
//! - **Handler files** name a handler kind and the event it answers to.
//! - **Handler kinds** live in a [`framework::HandlerCatalog`], contributed at
//!   link time through [`framework::HANDLER_KINDS`].
//! - **The registry** binds one listener per event name to the bus of the
//!   kind's category, and supports per-event reload and bulk teardown.
//! - **The client** ([`runtime::AsraClient`]) loads both categories, logs in,
//!   and tears everything down on shutdown.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use asra::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     init_logging(&config.logging);
//!
//!     let client = AsraClient::builder(Arc::new(LocalGateway::default()))
//!         .config(config)
//!         .build()?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub use asra_core as core;
pub use asra_framework as framework;
pub use asra_runtime as runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    // Client and configuration
    pub use asra_runtime::config::{AsraConfig, ConfigLoader, load_config};
    pub use asra_runtime::logging::init_from_config as init_logging;
    pub use asra_runtime::{AsraClient, ClientError, ClientState, CredentialSource};

    // Handlers
    pub use asra_core::{
        BoxError, BoxedHandler, Category, EventHandler, EventPayload, Gateway, LocalGateway,
    };
    pub use asra_framework::{
        HANDLER_KINDS, HandlerCatalog, HandlerContext, HandlerKind, HandlerSpec,
        linkme::distributed_slice,
    };

    // Output
    pub use asra_framework::{
        BotLogger, ColorKey, EmbedBuilder, EmbedColors, EmbedField, EmbedTimestamp, LogLevel,
    };

    // Logging macros
    pub use asra_runtime::prelude::*;
}
