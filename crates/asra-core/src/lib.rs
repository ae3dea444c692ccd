//! # Asra Core
//!
//! The building blocks shared by every layer of the Asra bot client.
//!
//! - **Events**: the [`EventHandler`] trait, the [`Category`] tag that decides
//!   which bus a handler binds to, and the [`EventPayload`] handed to triggers.
//! - **Buses**: [`EventBus`], a named-listener registry with detachable
//!   [`ListenerId`]s. The platform connection owns two of them ([`EventBuses`]).
//! - **Gateway**: the [`Gateway`] trait standing in for the platform
//!   connection, plus [`LocalGateway`], an in-process implementation.
//!
//! ```text
//! ┌──────────────┐  login / destroy   ┌─────────────────────────────┐
//! │ Asra client  │───────────────────▶│ Gateway                     │
//! │  (registry)  │  on / off          │  ├── client EventBus        │
//! │              │───────────────────▶│  └── transport EventBus     │
//! └──────────────┘                    └─────────────────────────────┘
//! ```

pub mod bus;
pub mod error;
pub mod event;
pub mod gateway;

pub use bus::{EventBus, EventBuses, Listener, ListenerId};
pub use error::{BoxError, GatewayError, GatewayResult};
pub use event::{BoxedHandler, Category, EventHandler, EventPayload, handler_listener};
pub use gateway::{Gateway, LocalGateway};
