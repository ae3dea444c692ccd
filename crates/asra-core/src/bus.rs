//! Named-listener event buses.
//!
//! An [`EventBus`] maps event names to listeners. Every attached listener gets
//! a [`ListenerId`], which is the only way to detach it again: two listeners
//! built from the same handler are still distinct entries.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{self, BoxFuture};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use crate::event::{Category, EventPayload};

/// Async callback invoked when an event fires.
pub type Listener = Arc<dyn Fn(EventPayload) -> BoxFuture<'static, ()> + Send + Sync>;

/// Identifies one attached listener on one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registry of named listeners.
///
/// # Example
///
/// ```rust,ignore
/// let bus = EventBus::new("client");
/// let id = bus.on("ready", listener);
/// bus.emit("ready", json!({})).await;
/// assert!(bus.off("ready", id));
/// ```
pub struct EventBus {
    name: &'static str,
    next_id: AtomicU64,
    listeners: RwLock<HashMap<String, Vec<(ListenerId, Listener)>>>,
}

impl EventBus {
    /// Creates an empty bus. `name` only shows up in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the bus name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Attaches a listener to `event`.
    pub fn on(&self, event: &str, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        trace!(bus = self.name, event, listener = %id, "Listener attached");
        id
    }

    /// Detaches the listener `id` from `event`.
    ///
    /// Returns `false` when no such listener was attached.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event);
        }
        if removed {
            trace!(bus = self.name, event, listener = %id, "Listener detached");
        }
        removed
    }

    /// Number of listeners attached to `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }

    /// Number of listeners attached across all events.
    pub fn total_listeners(&self) -> usize {
        self.listeners.read().values().map(Vec::len).sum()
    }

    /// Fires `event`, running every attached listener concurrently.
    ///
    /// Returns the number of listeners that ran.
    pub async fn emit(&self, event: &str, data: Value) -> usize {
        // Snapshot so listeners may attach/detach while running.
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .get(event)
            .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        if snapshot.is_empty() {
            return 0;
        }

        let payload = EventPayload::new(event, data);
        let count = snapshot.len();
        future::join_all(snapshot.into_iter().map(|l| l(payload.clone()))).await;
        count
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("name", &self.name)
            .field("listeners", &self.total_listeners())
            .finish()
    }
}

/// The pair of buses owned by a platform connection.
#[derive(Debug, Clone)]
pub struct EventBuses {
    /// Bus for [`Category::ClientEvent`] handlers.
    pub client: Arc<EventBus>,
    /// Bus for [`Category::TransportEvent`] handlers.
    pub transport: Arc<EventBus>,
}

impl EventBuses {
    /// Creates two fresh, empty buses.
    pub fn new() -> Self {
        Self {
            client: Arc::new(EventBus::new("client")),
            transport: Arc::new(EventBus::new("transport")),
        }
    }

    /// Selects the bus a handler of `category` binds to.
    pub fn for_category(&self, category: Category) -> &Arc<EventBus> {
        match category {
            Category::ClientEvent => &self.client,
            Category::TransportEvent => &self.transport,
        }
    }

    /// Listeners attached across both buses.
    pub fn total_listeners(&self) -> usize {
        self.client.total_listeners() + self.transport.total_listeners()
    }
}

impl Default for EventBuses {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counting_listener(counter: Arc<AtomicUsize>) -> Listener {
        Arc::new(move |_payload: EventPayload| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_emit_runs_attached_listeners() {
        let bus = EventBus::new("client");
        let counter = Arc::new(AtomicUsize::new(0));
        bus.on("ready", counting_listener(Arc::clone(&counter)));
        bus.on("ready", counting_listener(Arc::clone(&counter)));
        bus.on("messageCreate", counting_listener(Arc::clone(&counter)));

        assert_eq!(bus.emit("ready", json!({})).await, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(bus.emit("unknown", json!({})).await, 0);
    }

    #[tokio::test]
    async fn test_off_detaches_only_that_listener() {
        let bus = EventBus::new("client");
        let counter = Arc::new(AtomicUsize::new(0));
        let first = bus.on("ready", counting_listener(Arc::clone(&counter)));
        let _second = bus.on("ready", counting_listener(Arc::clone(&counter)));

        assert!(bus.off("ready", first));
        assert!(!bus.off("ready", first));
        assert_eq!(bus.listener_count("ready"), 1);

        bus.emit("ready", json!({})).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_unknown_event() {
        let bus = EventBus::new("transport");
        let id = bus.on("rateLimited", counting_listener(Arc::new(AtomicUsize::new(0))));
        assert!(!bus.off("response", id));
        assert_eq!(bus.total_listeners(), 1);
    }

    #[test]
    fn test_buses_select_by_category() {
        let buses = EventBuses::new();
        assert_eq!(buses.for_category(Category::ClientEvent).name(), "client");
        assert_eq!(
            buses.for_category(Category::TransportEvent).name(),
            "transport"
        );
    }
}
