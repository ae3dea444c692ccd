//! Ready Bot Example
//!
//! Wires configuration, logging, the handler catalog and the client together
//! against the in-process gateway.
//!
//! Handlers are declared by the files under `events/`:
//!
//! ```text
//! events/client/ready.toml            greeter              (this binary)
//! events/client/guild_create.toml     log_event            (built in)
//! events/transport/rate_limited.toml  log_transport_event  (built in)
//! ```
//!
//! # Usage
//!
//! ```bash
//! cd demos/ready_bot
//! DEVELOPMENT_TOKEN=dev cargo run --package ready-bot
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use asra::prelude::*;
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;

// ============================================================================
// Handler Kinds
// ============================================================================

#[distributed_slice(HANDLER_KINDS)]
#[linkme(crate = asra::framework::linkme)]
static GREETER: HandlerKind = HandlerKind::new("greeter", Category::ClientEvent, greeter);

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GreeterSettings {
    greeting: String,
}

impl Default for GreeterSettings {
    fn default() -> Self {
        Self {
            greeting: "Hello".to_string(),
        }
    }
}

/// Announces the session once the gateway reports `ready`.
struct Greeter {
    event: String,
    greeting: String,
    logger: BotLogger,
}

#[derive(Debug, Deserialize)]
struct ReadyData {
    user: String,
}

#[async_trait::async_trait]
impl EventHandler for Greeter {
    fn event_name(&self) -> &str {
        &self.event
    }

    async fn on_trigger(&self, payload: EventPayload) -> Result<(), BoxError> {
        let ready: ReadyData = payload.parse()?;
        let started = OffsetDateTime::now_utc().format(&Rfc2822)?;

        let embed = EmbedBuilder::success(self.logger.palette())
            .title(format!("{}, {}!", self.greeting, ready.user))
            .field(EmbedField::new("session started", started).inline())
            .to_json()?;

        self.logger
            .log(LogLevel::Success, &format!("Logged in as {}", ready.user));
        debug!(embed = %embed, "Greeting embed");
        Ok(())
    }
}

fn greeter(spec: &HandlerSpec, context: &HandlerContext) -> Result<BoxedHandler, BoxError> {
    let settings: GreeterSettings = spec.settings()?;
    let event = if spec.event.is_empty() {
        "ready".to_string()
    } else {
        spec.event.clone()
    };

    Ok(Arc::new(Greeter {
        event,
        greeting: settings.greeting,
        logger: context.logger().clone(),
    }))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "ready-bot", about = "A minimal Asra bot")]
struct Args {
    /// Configuration file (defaults to asra.toml in the working directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile (development, production, ...)
    #[arg(short, long)]
    profile: Option<String>,

    /// Initialize, then shut down immediately
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().with_current_dir();
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile);
    }
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let config = loader.load()?;
    init_logging(&config.logging);

    let gateway = Arc::new(LocalGateway::new("ready-bot"));
    let client = AsraClient::builder(gateway.clone())
        .config(config)
        .build()?;

    let once = args.once;
    let buses = gateway.buses();
    client
        .run_until(async move {
            // The local gateway never produces platform events on its own.
            buses
                .client
                .emit("guildCreate", json!({ "id": 1, "name": "Asra Lab" }))
                .await;
            buses
                .transport
                .emit("rateLimited", json!({ "route": "/channels", "retry_after": 1.5 }))
                .await;

            if !once {
                info!("Press Ctrl+C to stop.");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        })
        .await?;

    client.logger().log(LogLevel::Success, "Shut down cleanly");
    Ok(())
}
