//! BVC Position Telemetry
//!
//! Collects player state from a host game server on a fixed cadence and
//! ships it to a Bedrock Voice Chat server, which uses it for proximity
//! voice.
//!
//! ## Architecture
//!
//! ```text
//! TelemetryAgent  (agent.rs)
//!   └── DeliveryScheduler  (scheduler.rs)  ← gate + dispatch per tick
//!         ├── PlayerStateProvider  (provider/)   ← host roster
//!         │     ├── DirectQueryProvider
//!         │     └── EventTrackedProvider + StatusWatcher
//!         ├── Payload  (protocol.rs)            ← wire body
//!         └── PositionRouter  (transport.rs)
//!               ├── EmbeddedServer  (embedded.rs → ffi.rs)
//!               └── HttpTransport   POST {server}/api/position
//! ```
//!
//! Delivery is fire-and-forget: a tick never waits on the network, and every
//! failure ends as a log line rather than an error in the host's loop.

// Wire and config types are always available (no server feature needed).
pub mod config;
pub mod error;
pub mod protocol;
pub mod types;

// Runtime modules require the `server` feature.
#[cfg(feature = "server")]
pub mod agent;
#[cfg(feature = "server")]
pub mod embedded;
#[cfg(feature = "native")]
pub mod ffi;
#[cfg(feature = "server")]
pub mod provider;
#[cfg(feature = "server")]
pub mod scheduler;
#[cfg(feature = "server")]
pub mod transport;

// Convenience re-exports (server only)
#[cfg(feature = "server")]
pub use agent::TelemetryAgent;
#[cfg(feature = "server")]
pub use embedded::{EmbeddedServer, NativeBridge, ServerHandle};
#[cfg(feature = "server")]
pub use provider::{
    DirectQueryProvider, EventTrackedProvider, FileWorld, PlayerStateProvider, StatusWatcher,
};
#[cfg(feature = "server")]
pub use scheduler::{DeliveryScheduler, SchedulerStats, TickOutcome};
#[cfg(feature = "server")]
pub use transport::{HttpTransport, PositionRouter, PositionSink};

pub use config::RuntimeConfig;
pub use protocol::Payload;
pub use types::{Coordinates, Dimension, Game, Orientation, PlayerRecord};
