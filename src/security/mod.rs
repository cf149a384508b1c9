//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request head:
//!     → auth.rs (AuthPolicy::decide)
//!     → credentials.rs (none / basic / bearer)
//!     → AuthDecision consumed by http::middleware::auth
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any policy error, panic or timeout
//! - No trust in client input
//! - Secrets never appear in Debug output

pub mod auth;
pub mod credentials;

pub use auth::{policy_from_config, AuthDecision, AuthError, AuthPolicy, DenyReason};
pub use credentials::{AllowAll, BasicAuth, BearerToken};
