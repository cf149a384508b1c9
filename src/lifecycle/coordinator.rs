//! Server lifecycle coordination.
//!
//! The coordinator starts the HTTP server in the background, then waits for
//! whichever comes first: a termination signal or the server task ending on
//! its own (which only happens on a bind or runtime failure). Either way it
//! raises the shutdown flag and gives in-flight requests a bounded time to
//! finish before aborting them.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::middleware::AuthInterceptor;
use crate::http::HttpServer;
use crate::lifecycle::signals::{Signals, TerminationSignal};
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionTracker, Listener};
use crate::security::{policy_from_config, AuthPolicy};

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Starting,
    Running { addr: SocketAddr },
    ShuttingDown,
    Stopped,
}

/// What started the shutdown sequence.
#[derive(Debug)]
pub enum ShutdownTrigger {
    Signal(TerminationSignal),
    ServerFailed(ServerError),
}

/// How draining ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every in-flight request finished within the bound.
    Clean,
    /// The bound expired; remaining connections were aborted.
    Forced { timeout: Duration, in_flight: u64 },
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct StopReport {
    pub trigger: ShutdownTrigger,
    pub drain: DrainOutcome,
}

impl StopReport {
    /// Collapse into the error the operator should see, if any.
    pub fn into_result(self) -> Result<(), ServerError> {
        if let ShutdownTrigger::ServerFailed(err) = self.trigger {
            return Err(err);
        }
        match self.drain {
            DrainOutcome::Clean => Ok(()),
            DrainOutcome::Forced { timeout, in_flight } => {
                Err(ServerError::ShutdownTimeout { timeout, in_flight })
            }
        }
    }
}

/// Owns the server from start to stop. One coordinator runs at most once.
pub struct ShutdownCoordinator {
    config: Arc<ServerConfig>,
    interceptor: AuthInterceptor,
    state: Arc<watch::Sender<LifecycleState>>,
}

impl ShutdownCoordinator {
    /// Coordinator using the auth policy selected in the config.
    pub fn new(config: ServerConfig) -> Self {
        let policy = policy_from_config(&config.auth);
        Self::with_policy(config, policy)
    }

    /// Coordinator with a caller-supplied policy.
    pub fn with_policy(config: ServerConfig, policy: Arc<dyn AuthPolicy>) -> Self {
        let interceptor = AuthInterceptor::new(policy, config.timeouts.auth());
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            config: Arc::new(config),
            interceptor,
            state: Arc::new(state),
        }
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Run until SIGINT/SIGTERM or a server failure.
    pub async fn run(self) -> Result<StopReport, ServerError> {
        let signals = Signals::register().map_err(ServerError::Signal)?;
        Ok(self.run_until(signals.recv()).await)
    }

    /// Run until `signal` resolves or the server fails, whichever is first.
    pub async fn run_until<S>(self, signal: S) -> StopReport
    where
        S: Future<Output = TerminationSignal>,
    {
        self.transition(LifecycleState::Starting);
        tracing::info!(
            root = %self.config.site.root.display(),
            address = %self.config.listener.address(),
            auth = self.interceptor.policy_name(),
            "Starting server"
        );

        let shutdown = Shutdown::new();
        let server = HttpServer::new(Arc::clone(&self.config), self.interceptor.clone());
        let tracker = server.tracker();
        let mut handle = self.spawn_server(server, &shutdown);

        tokio::pin!(signal);
        let (trigger, server_done) = tokio::select! {
            sig = &mut signal => {
                tracing::info!(signal = %sig, "Shutting down ...");
                (ShutdownTrigger::Signal(sig), false)
            }
            result = &mut handle => {
                let err = match result {
                    Ok(Err(e)) => e,
                    Ok(Ok(())) => ServerError::Runtime("listener exited before shutdown".into()),
                    Err(join) => ServerError::Runtime(join.to_string()),
                };
                tracing::error!(error = %err, "Startup failed, exiting");
                (ShutdownTrigger::ServerFailed(err), true)
            }
        };

        self.transition(LifecycleState::ShuttingDown);
        shutdown.trigger();

        let drain = if server_done {
            DrainOutcome::Clean
        } else {
            drain_server(handle, &tracker, self.config.timeouts.shutdown()).await
        };

        match drain {
            DrainOutcome::Clean => tracing::info!("Web server is down"),
            DrainOutcome::Forced { timeout, in_flight } => tracing::warn!(
                timeout = ?timeout,
                in_flight,
                "Web server forced to shut down"
            ),
        }
        self.transition(LifecycleState::Stopped);

        StopReport { trigger, drain }
    }

    fn spawn_server(&self, server: HttpServer, shutdown: &Shutdown) -> JoinHandle<Result<(), ServerError>> {
        let listener_config = self.config.listener.clone();
        let stop = shutdown.subscribe();
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let listener = Listener::bind(&listener_config).await?;
            let addr = listener.local_addr().map_err(|e| ServerError::Runtime(e.to_string()))?;
            // Only move to Running if shutdown has not already begun.
            state.send_if_modified(|current| {
                if *current == LifecycleState::Starting {
                    *current = LifecycleState::Running { addr };
                    true
                } else {
                    false
                }
            });
            tracing::info!(address = %addr, "Server is listening");
            server.run(listener, stop).await
        })
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = ?previous, to = ?next, "Lifecycle transition");
    }
}

/// Wait for the server task to finish, aborting it after `timeout`.
async fn drain_server(
    mut handle: JoinHandle<Result<(), ServerError>>,
    tracker: &ConnectionTracker,
    timeout: Duration,
) -> DrainOutcome {
    tracing::info!(
        open_connections = tracker.active_count(),
        timeout = ?timeout,
        "Waiting for in-flight requests"
    );

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(Ok(()))) => DrainOutcome::Clean,
        Ok(Ok(Err(e))) => {
            tracing::warn!(error = %e, "Server reported an error while stopping");
            DrainOutcome::Clean
        }
        Ok(Err(join)) => {
            tracing::warn!(error = %join, "Server task ended abnormally while stopping");
            DrainOutcome::Clean
        }
        Err(_) => {
            let in_flight = tracker.active_count();
            handle.abort();
            // Aborting drops the connection set, which aborts every connection task.
            let _ = handle.await;
            DrainOutcome::Forced { timeout, in_flight }
        }
    }
}
