//! # Broadcast Server
//!
//! Relays the Action stream from the ActionManager to any number of
//! simultaneously connected WebSocket listeners, with per-connection
//! backpressure.
//!
//! One coordination task serializes connection registration, teardown,
//! and Action relay; each connection runs an inbound and an outbound
//! pump. A connection whose bounded queue fills is evicted immediately
//! rather than stalling the coordinator or other connections.

mod errors;
mod server;

pub use errors::{BroadcastError, BroadcastResult};
pub use server::{BroadcastConfig, BroadcastServer};
