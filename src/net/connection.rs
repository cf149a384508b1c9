//! Connection lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Count open connections so shutdown can report what it abandoned
//! - Track per-connection request activity for the idle timeout
//! - Bound how long a started request head may take to arrive

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks open connections.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self {
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a new open connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        let active = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::record_connection_opened(active);
        ConnectionGuard {
            count: Arc::clone(&self.count),
            id: ConnectionId::new(),
        }
    }

    /// Get current open connection count.
    pub fn active_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let active = self.count.fetch_sub(1, Ordering::Relaxed) - 1;
        metrics::record_connection_closed(active);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

const NO_HEAD: u64 = u64::MAX;

/// Request activity on a single connection.
///
/// A connection is idle when no request is in flight and none has started or
/// finished for the idle period. Bytes arriving on an idle connection start a
/// request head, which must be complete within the read timeout.
#[derive(Debug)]
pub struct ConnectionActivity {
    epoch: Instant,
    last_activity_ms: AtomicU64,
    in_flight: AtomicUsize,
    head_started_ms: AtomicU64,
    head_started: Notify,
}

impl ConnectionActivity {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            head_started_ms: AtomicU64::new(NO_HEAD),
            head_started: Notify::new(),
        }
    }

    /// Mark a request as started. Dropping the guard marks it finished.
    pub fn begin(self: &Arc<Self>) -> RequestGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.head_started_ms.store(NO_HEAD, Ordering::SeqCst);
        self.touch();
        RequestGuard {
            activity: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once the connection has been idle for `idle`.
    pub async fn idle_for(&self, idle: Duration) {
        loop {
            let busy = self.in_flight() > 0 || self.head_started_ms.load(Ordering::SeqCst) != NO_HEAD;
            let wait = if busy {
                idle
            } else {
                let quiet = self.epoch.elapsed().saturating_sub(self.last_activity());
                match idle.checked_sub(quiet) {
                    Some(remaining) if !remaining.is_zero() => remaining,
                    _ => return,
                }
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Record bytes read from the client. The first bytes seen while no
    /// request is in flight start the head-read clock.
    pub fn bytes_received(&self) {
        if self.in_flight() > 0 {
            return;
        }
        let now = self.now_ms();
        if self
            .head_started_ms
            .compare_exchange(NO_HEAD, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.head_started.notify_one();
        }
    }

    /// Resolves once a request head has been pending for longer than `read`.
    pub async fn head_read_expired(&self, read: Duration) {
        loop {
            let started = self.head_started_ms.load(Ordering::SeqCst);
            if started == NO_HEAD {
                self.head_started.notified().await;
                continue;
            }
            let pending = self.epoch.elapsed().saturating_sub(Duration::from_millis(started));
            match read.checked_sub(pending) {
                Some(remaining) if !remaining.is_zero() => tokio::time::sleep(remaining).await,
                _ => return,
            }
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn touch(&self) {
        self.last_activity_ms.store(self.now_ms(), Ordering::SeqCst);
    }

    fn last_activity(&self) -> Duration {
        Duration::from_millis(self.last_activity_ms.load(Ordering::SeqCst))
    }
}

impl Default for ConnectionActivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Held while a request is being handled on a connection.
#[derive(Debug)]
pub struct RequestGuard {
    activity: Arc<ConnectionActivity>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.activity.touch();
        self.activity.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Client stream that reports reads to a [`ConnectionActivity`].
#[derive(Debug)]
pub struct ActivityIo<T> {
    inner: T,
    activity: Arc<ConnectionActivity>,
}

impl<T> ActivityIo<T> {
    pub fn new(inner: T, activity: Arc<ConnectionActivity>) -> Self {
        Self { inner, activity }
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for ActivityIo<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if matches!(poll, Poll::Ready(Ok(()))) && buf.filled().len() > before {
            self.activity.bytes_received();
        }
        poll
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for ActivityIo<T> {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
