//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Coordinator (coordinator.rs):
//!     Idle → Starting → Running → ShuttingDown → Stopped
//!
//! Running → ShuttingDown, first of:
//!     signals.rs   SIGTERM/SIGINT
//!     server task  bind or runtime failure
//!
//! Shutdown (shutdown.rs):
//!     Flag raised → Stop accepting → Drain connections (bounded) → Exit
//! ```
//!
//! # Design Decisions
//! - Exactly one trigger is honoured; the other is dropped
//! - Shutdown has timeout: connections are aborted after the deadline
//! - A failed startup still runs the (empty) shutdown path

pub mod coordinator;
pub mod shutdown;
pub mod signals;

pub use coordinator::{DrainOutcome, LifecycleState, ShutdownCoordinator, ShutdownTrigger, StopReport};
pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::TerminationSignal;
