//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line (clap)          config file (TOML, optional)
//!     → cli.rs                     → loader.rs (parse & deserialize)
//!              ╲                  ╱
//!               loader.rs (CLI values override file values)
//!     → validation.rs (semantic checks, site root checked on disk)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc to the coordinator and server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load_config, ConfigError};
pub use schema::{AuthConfig, ListenerConfig, LogFormat, ServerConfig, TimeoutConfig};
