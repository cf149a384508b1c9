//! Static file server with request authentication and graceful shutdown.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::schema::ServerConfig;
pub use error::ServerError;
pub use http::HttpServer;
pub use lifecycle::{ShutdownCoordinator, StopReport};
