//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1.1, read/idle timeouts, request ID, tracing)
//!     → middleware/auth.rs (Allow → continue, Deny → response.rs 403)
//!     → static_files.rs (ServeDir under the site root)
//!     → Send to client
//! ```

pub mod middleware;
pub mod response;
pub mod server;
pub mod static_files;

pub use middleware::AuthInterceptor;
pub use server::HttpServer;
