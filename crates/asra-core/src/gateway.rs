//! The platform connection seen by the client.
//!
//! The wire protocol lives behind this trait. The client only needs to log in,
//! shut the connection down, and reach the two event buses.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, info};

use crate::bus::EventBuses;
use crate::error::{GatewayError, GatewayResult};

/// A connection to the chat platform.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// The client and transport buses of this connection.
    fn buses(&self) -> EventBuses;

    /// Establishes the connection using `token`.
    async fn login(&self, token: &str) -> GatewayResult<()>;

    /// Releases the connection. Must be safe to call more than once.
    async fn destroy(&self);
}

/// In-process gateway that accepts any non-empty token.
///
/// A successful login fires `ready` on the client bus with the bot user name,
/// which is what a real platform does once the session is established.
pub struct LocalGateway {
    buses: EventBuses,
    user: String,
    login_attempts: AtomicUsize,
    token: Mutex<Option<String>>,
    destroyed: AtomicBool,
}

impl LocalGateway {
    /// Creates a gateway whose session user is `user`.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            buses: EventBuses::new(),
            user: user.into(),
            login_attempts: AtomicUsize::new(0),
            token: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        }
    }

    /// How many times `login` has been called.
    pub fn login_attempts(&self) -> usize {
        self.login_attempts.load(Ordering::SeqCst)
    }

    /// Whether a session is currently established.
    pub fn is_connected(&self) -> bool {
        self.token.lock().is_some()
    }

    /// Whether `destroy` has been called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl Default for LocalGateway {
    fn default() -> Self {
        Self::new("asra")
    }
}

#[async_trait]
impl Gateway for LocalGateway {
    fn buses(&self) -> EventBuses {
        self.buses.clone()
    }

    async fn login(&self, token: &str) -> GatewayResult<()> {
        self.login_attempts.fetch_add(1, Ordering::SeqCst);

        if self.is_destroyed() {
            return Err(GatewayError::Destroyed);
        }
        if token.trim().is_empty() {
            return Err(GatewayError::InvalidCredential {
                reason: "token is empty".to_string(),
            });
        }

        *self.token.lock() = Some(token.to_string());
        info!(user = %self.user, "Local gateway session established");

        let fired = self
            .buses
            .client
            .emit("ready", json!({ "user": self.user }))
            .await;
        debug!(listeners = fired, "Dispatched ready event");
        Ok(())
    }

    async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.token.lock().take();
        info!(user = %self.user, "Local gateway destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_rejects_empty_token() {
        let gateway = LocalGateway::default();
        let result = gateway.login("  ").await;
        assert!(matches!(
            result,
            Err(GatewayError::InvalidCredential { .. })
        ));
        assert!(!gateway.is_connected());
        assert_eq!(gateway.login_attempts(), 1);
    }

    #[tokio::test]
    async fn test_login_then_destroy() {
        let gateway = LocalGateway::new("tester");
        gateway.login("secret").await.unwrap();
        assert!(gateway.is_connected());

        gateway.destroy().await;
        gateway.destroy().await;
        assert!(gateway.is_destroyed());
        assert!(!gateway.is_connected());
        assert!(matches!(
            gateway.login("secret").await,
            Err(GatewayError::Destroyed)
        ));
    }
}
