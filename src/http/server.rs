//! HTTP server setup and connection handling.
//!
//! # Responsibilities
//! - Create the Axum router: static files behind the auth interceptor
//! - Wire up middleware (tracing, request ID, response timeout)
//! - Run the accept loop until shutdown is signalled
//! - Serve each connection over HTTP/1.1 with head-read and idle timeouts
//! - On shutdown: stop accepting, let in-flight requests finish

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Request, middleware, response::Response, Router};
use hyper::{body::Incoming, server::conn::http1};
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    service::TowerToHyperService,
};
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tower::{Service, ServiceExt};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::middleware::{auth_middleware, AuthInterceptor};
use crate::http::static_files::serve_site;
use crate::lifecycle::ShutdownListener;
use crate::net::{ActivityIo, ConnectionActivity, ConnectionGuard, ConnectionPermit, ConnectionTracker, Listener};

/// HTTP server for the static site.
pub struct HttpServer {
    router: Router,
    config: Arc<ServerConfig>,
    tracker: ConnectionTracker,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: Arc<ServerConfig>, interceptor: AuthInterceptor) -> Self {
        let router = Self::build_router(&config, interceptor);
        Self {
            router,
            config,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The interceptor sits directly in front of the file service, inside the
    /// response timeout, so a slow policy is bounded by `write_secs` as well
    /// as by its own `auth_secs`.
    #[allow(deprecated)]
    pub fn build_router(config: &ServerConfig, interceptor: AuthInterceptor) -> Router {
        Router::new()
            .fallback_service(serve_site(&config.site))
            .layer(middleware::from_fn_with_state(interceptor, auth_middleware))
            .layer(TimeoutLayer::new(config.timeouts.write()))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Handle to the open-connection count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires, then wait for every connection to finish.
    ///
    /// Dropping the returned future aborts all connection tasks.
    pub async fn run(self, listener: Listener, mut shutdown: ShutdownListener) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(|e| ServerError::Runtime(e.to_string()))?;
        tracing::info!(address = %addr, "HTTP server starting");

        // Hyper's header timer also runs between keep-alive requests; the
        // head-read bound is enforced in serve_connection instead.
        let mut http = http1::Builder::new();
        http.timer(TokioTimer::new())
            .header_read_timeout(None)
            .keep_alive(true);

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let guard = self.tracker.track();
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            (permit, guard),
                            self.router.clone(),
                            http.clone(),
                            Arc::clone(&self.config),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        // Usually fd exhaustion; back off instead of spinning.
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        tracing::info!(
            open_connections = self.tracker.active_count(),
            free_slots = listener.available_permits(),
            max_connections = listener.max_connections(),
            "Closing listener, draining connections"
        );
        drop(listener);

        while connections.join_next().await.is_some() {}

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    slot: (ConnectionPermit, ConnectionGuard),
    router: Router,
    http: http1::Builder,
    config: Arc<ServerConfig>,
    mut shutdown: ShutdownListener,
) {
    let connection_id = slot.1.id();
    let (read_timeout, idle_timeout) = (config.timeouts.read(), config.timeouts.idle());
    let activity = Arc::new(ConnectionActivity::new());
    let service = TowerToHyperService::new(track_activity(router, Arc::clone(&activity)));
    let io = TokioIo::new(ActivityIo::new(stream, Arc::clone(&activity)));
    let conn = http.serve_connection(io, service);
    tokio::pin!(conn);

    let mut closing = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(connection_id = %connection_id, peer = %peer, error = %e, "Connection error");
                }
                break;
            }
            _ = shutdown.recv(), if !closing => {
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
            _ = activity.idle_for(idle_timeout), if !closing => {
                tracing::debug!(connection_id = %connection_id, peer = %peer, "Closing idle connection");
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
            _ = activity.head_read_expired(read_timeout) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    peer = %peer,
                    timeout = ?read_timeout,
                    "Request head not received in time, closing connection"
                );
                break;
            }
        }
    }
}

/// Wrap the router so every request marks the connection busy.
fn track_activity(
    router: Router,
    activity: Arc<ConnectionActivity>,
) -> impl Service<Request<Incoming>, Response = Response, Error = Infallible, Future: Send> + Clone {
    tower::service_fn(move |request: Request<Incoming>| {
        let router = router.clone();
        let busy = activity.begin();
        async move {
            let response = router.oneshot(request).await;
            drop(busy);
            response
        }
    })
}
