//! Process-level error taxonomy.
//!
//! Request-level failures (denied auth, missing files, request timeouts) are
//! answered per request and never show up here.

use std::process::ExitCode;
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid or missing configuration; the server never starts.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The listener could not bind.
    #[error("failed to listen on {address}: {source}")]
    Startup {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// In-flight requests outlived the shutdown bound and were aborted.
    #[error("shutdown timed out after {timeout:?} with {in_flight} connection(s) still open")]
    ShutdownTimeout { timeout: Duration, in_flight: u64 },

    /// Signal handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),

    /// The listener task ended without being asked to.
    #[error("server stopped unexpectedly: {0}")]
    Runtime(String),
}

impl ServerError {
    /// Stable exit code per error class.
    pub fn exit_code(&self) -> ExitCode {
        let code = match self {
            ServerError::Configuration(_) => 1,
            ServerError::Startup { .. } => 2,
            ServerError::ShutdownTimeout { .. } => 3,
            ServerError::Signal(_) | ServerError::Runtime(_) => 4,
        };
        ExitCode::from(code)
    }
}
