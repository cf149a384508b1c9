//! static-gate
//!
//! Serves a static website from a directory, asking an authentication policy
//! about every request before it touches the filesystem.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!   Client Request    │  ┌──────────┐   ┌───────────┐   ┌─────────┐  │
//!   ──────────────────┼─▶│   net    │──▶│   http    │──▶│  auth   │  │
//!                     │  │ listener │   │  server   │   │intercept│  │
//!                     │  └──────────┘   └───────────┘   └────┬────┘  │
//!                     │                                allow │ deny  │
//!   Client Response   │                      ┌─────────────┐ │ → 403 │
//!   ◀─────────────────┼──────────────────────│ static files│◀┘       │
//!                     │                      └─────────────┘         │
//!                     │  ┌────────────────────────────────────────┐  │
//!                     │  │ lifecycle: signal ⟷ server failure     │  │
//!                     │  │            → bounded graceful shutdown │  │
//!                     │  └────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use static_gate::config::{cli::version_banner, load_config, AuthConfig, Cli};
use static_gate::observability::{logging, metrics};
use static_gate::{ServerError, ShutdownCoordinator, StopReport};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.version {
        print!("{}", version_banner());
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ServerError::from(e).exit_code();
        }
    };

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("warning: logging already initialised: {}", e);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        root = %config.site.root.display(),
        address = %config.listener.address(),
        shutdown_timeout_secs = config.timeouts.shutdown_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    if config.auth == AuthConfig::None {
        tracing::warn!("Authentication is disabled; every request is served");
    }

    let outcome = ShutdownCoordinator::new(config)
        .run()
        .await
        .and_then(StopReport::into_result);

    match outcome {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Exiting with error");
            e.exit_code()
        }
    }
}
