//! WebSocket infrastructure for realtime alarm delivery.
//!
//! Provides the connection registry, heartbeat, and the HTTP upgrade
//! handler used by the `/ws` route.

mod handler;
mod heartbeat;
pub mod registry;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use registry::{ConnectionRegistry, DeliveryReport, PresenceChange};
