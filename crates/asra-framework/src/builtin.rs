//! Handler kinds shipped with the framework.
//!
//! Both kinds log every payload of the event named in their definition file,
//! one on each bus:
//!
//! ```toml
//! handler = "log_transport_event"
//! event = "rateLimited"
//!
//! [settings]
//! level = "warn"
//! ```

use std::sync::Arc;

use asra_core::{BoxError, BoxedHandler, Category, EventHandler, EventPayload};
use async_trait::async_trait;
use linkme::distributed_slice;
use serde::Deserialize;

use crate::catalog::{HANDLER_KINDS, HandlerContext, HandlerKind, HandlerSpec};
use crate::embed::Embed;
use crate::logger::{BotLogger, LogLevel};

#[distributed_slice(HANDLER_KINDS)]
static LOG_EVENT: HandlerKind = HandlerKind::new("log_event", Category::ClientEvent, log_event);

#[distributed_slice(HANDLER_KINDS)]
static LOG_TRANSPORT_EVENT: HandlerKind =
    HandlerKind::new("log_transport_event", Category::TransportEvent, log_event);

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LogSettings {
    level: LogLevel,
    /// Prefix placed before the payload. Defaults to the event name.
    prefix: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            prefix: None,
        }
    }
}

/// Logs each payload of one event through a [`BotLogger`].
#[derive(Debug)]
pub struct LogEventHandler {
    event: String,
    level: LogLevel,
    prefix: String,
    logger: BotLogger,
}

impl LogEventHandler {
    /// Creates a handler for `event` using the default palette.
    pub fn new(event: impl Into<String>, level: LogLevel) -> Self {
        let event = event.into();
        Self {
            prefix: event.clone(),
            event,
            level,
            logger: BotLogger::default(),
        }
    }

    /// Presents lines through `logger` instead of the default one.
    pub fn with_logger(mut self, logger: BotLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Line logged for `payload`.
    pub fn render(&self, payload: &EventPayload) -> String {
        format!("{}: {}", self.prefix, payload.data())
    }

    /// Embed for `payload`, coloured by the handler's level.
    pub fn embed(&self, payload: &EventPayload) -> Embed {
        self.logger.log_embed(self.level, &self.render(payload))
    }
}

#[async_trait]
impl EventHandler for LogEventHandler {
    fn event_name(&self) -> &str {
        &self.event
    }

    async fn on_load(&self) -> Result<(), BoxError> {
        self.logger
            .log(LogLevel::Debug, &format!("listening for '{}'", self.event));
        Ok(())
    }

    async fn on_trigger(&self, payload: EventPayload) -> Result<(), BoxError> {
        self.logger.log(self.level, &self.render(&payload));
        Ok(())
    }
}

fn log_event(spec: &HandlerSpec, context: &HandlerContext) -> Result<BoxedHandler, BoxError> {
    let settings: LogSettings = spec.settings()?;
    let mut handler = LogEventHandler::new(spec.event.clone(), settings.level)
        .with_logger(context.logger().clone());
    if let Some(prefix) = settings.prefix {
        handler.prefix = prefix;
    }
    Ok(Arc::new(handler))
}
