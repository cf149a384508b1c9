//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (open-connection count, per-connection activity)
//!     → Hand off to HTTP layer
//!
//! Connection States:
//!     Active → Idle (no request in flight) → Draining → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - Plain TCP only; TLS is terminated elsewhere

pub mod connection;
pub mod listener;

pub use connection::{ActivityIo, ConnectionActivity, ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
