//! Event handler abstractions.
//!
//! A handler is a unit of behavior bound to one named platform event. Where it
//! binds is decided by its [`Category`]: client-level events are fired by the
//! logical bot client, transport-level events by the network layer beneath it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::bus::Listener;
use crate::error::BoxError;

// ============================================================================
// Category
// ============================================================================

/// The event source a handler listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Events fired by the logical bot client (`ready`, `messageCreate`, ...).
    ClientEvent,
    /// Events fired by the transport layer (`rateLimited`, `response`, ...).
    TransportEvent,
}

impl Category {
    /// Both categories, in load order.
    pub const ALL: [Category; 2] = [Category::ClientEvent, Category::TransportEvent];

    /// Returns the category name used in logs and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientEvent => "client",
            Self::TransportEvent => "transport",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "client" | "client_event" => Ok(Self::ClientEvent),
            "transport" | "transport_event" | "rest" => Ok(Self::TransportEvent),
            other => Err(format!("unknown event category: {other}")),
        }
    }
}

// ============================================================================
// Payload
// ============================================================================

/// Data delivered to a handler when its event fires.
///
/// The payload is raw JSON so that handlers decide for themselves how much of
/// it they want to deserialize.
#[derive(Debug, Clone)]
pub struct EventPayload {
    event: Arc<str>,
    data: Arc<Value>,
}

impl EventPayload {
    /// Creates a payload for the named event.
    pub fn new(event: impl Into<Arc<str>>, data: Value) -> Self {
        Self {
            event: event.into(),
            data: Arc::new(data),
        }
    }

    /// Name of the event that fired.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Raw event data.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Deserializes the event data into `T`.
    pub fn parse<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(self.data.as_ref())
    }
}

// ============================================================================
// EventHandler
// ============================================================================

/// A handler bound to one named event.
///
/// # Example
///
/// ```rust,ignore
/// struct Ready;
///
/// #[async_trait]
/// impl EventHandler for Ready {
///     fn event_name(&self) -> &str {
///         "ready"
///     }
///
///     async fn on_trigger(&self, payload: EventPayload) -> Result<(), BoxError> {
///         info!(user = %payload.data()["user"], "Logged in");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// The event this handler listens to.
    ///
    /// An empty name means the handler is never registered.
    fn event_name(&self) -> &str;

    /// Called once after the handler has been instantiated.
    async fn on_load(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called every time the event fires.
    async fn on_trigger(&self, payload: EventPayload) -> Result<(), BoxError>;
}

/// Shared, type-erased handler.
pub type BoxedHandler = Arc<dyn EventHandler>;

/// Wraps a handler's trigger hook into a bus [`Listener`].
///
/// Trigger errors are logged and swallowed so one failing handler never
/// affects the bus.
pub fn handler_listener(handler: BoxedHandler) -> Listener {
    Arc::new(move |payload: EventPayload| {
        let handler = Arc::clone(&handler);
        async move {
            if let Err(e) = handler.on_trigger(payload.clone()).await {
                error!(
                    event = %payload.event(),
                    error = %e,
                    "Event handler returned an error"
                );
            }
        }
        .boxed()
    })
}
