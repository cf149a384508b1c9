//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::request::Parts;
use static_gate::config::ServerConfig;
use static_gate::lifecycle::{LifecycleState, StopReport, TerminationSignal};
use static_gate::security::{AuthDecision, AuthError, AuthPolicy};
use static_gate::ShutdownCoordinator;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const INDEX_HTML: &str = "<html><body>top secret landing page</body></html>";

/// A site root with `index.html` and `docs/guide.txt`.
pub fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX_HTML).unwrap();
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs/guide.txt"), "read me").unwrap();
    dir
}

/// Config bound to an ephemeral loopback port.
pub fn config(site: &TempDir) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.site.root = site.path().to_path_buf();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config
}

/// A running coordinator plus the handles a test needs to drive it.
pub struct RunningServer {
    pub addr: SocketAddr,
    signal: Option<oneshot::Sender<TerminationSignal>>,
    pub handle: JoinHandle<StopReport>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Deliver a termination signal to the coordinator.
    pub fn signal(&mut self, signal: TerminationSignal) {
        if let Some(tx) = self.signal.take() {
            let _ = tx.send(signal);
        }
    }

    pub async fn stop(mut self) -> StopReport {
        self.signal(TerminationSignal::Terminate);
        tokio::time::timeout(Duration::from_secs(30), self.handle)
            .await
            .expect("coordinator did not stop in time")
            .unwrap()
    }
}

/// Start a coordinator with the policy and wait until it is listening.
pub async fn start(config: ServerConfig, policy: Option<Arc<dyn AuthPolicy>>) -> RunningServer {
    let coordinator = match policy {
        Some(policy) => ShutdownCoordinator::with_policy(config, policy),
        None => ShutdownCoordinator::new(config),
    };
    let mut states = coordinator.subscribe();
    let (tx, rx) = oneshot::channel();

    let handle = tokio::spawn(coordinator.run_until(async move {
        rx.await.unwrap_or(TerminationSignal::Terminate)
    }));

    let state = tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| matches!(s, LifecycleState::Running { .. })),
    )
    .await
    .expect("server did not start")
    .map(|s| *s)
    .unwrap();

    let LifecycleState::Running { addr } = state else {
        unreachable!()
    };

    RunningServer {
        addr,
        signal: Some(tx),
        handle,
    }
}

/// Client without a connection pool or system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Allows every request after a fixed delay and counts the calls.
/// Stands in for a slow handler.
pub struct SlowPolicy {
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl SlowPolicy {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthPolicy for SlowPolicy {
    async fn decide(&self, _request: &Parts) -> Result<AuthDecision, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(AuthDecision::Allow)
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}
