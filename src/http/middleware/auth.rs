//! Authentication middleware.
//! Gates every request on the configured policy before it reaches the files.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;

use crate::http::response::forbidden;
use crate::observability::metrics;
use crate::security::{AuthDecision, AuthPolicy, DenyReason};

/// Wraps an [`AuthPolicy`] with the fail-closed rules.
#[derive(Clone)]
pub struct AuthInterceptor {
    policy: Arc<dyn AuthPolicy>,
    decision_timeout: Duration,
}

impl AuthInterceptor {
    pub fn new(policy: Arc<dyn AuthPolicy>, decision_timeout: Duration) -> Self {
        Self {
            policy,
            decision_timeout,
        }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Evaluate a request head. Policy errors, panics and timeouts all deny.
    pub async fn intercept(&self, request: &Parts) -> AuthDecision {
        let decision = AssertUnwindSafe(self.policy.decide(request)).catch_unwind();

        match tokio::time::timeout(self.decision_timeout, decision).await {
            Ok(Ok(Ok(decision))) => decision,
            Ok(Ok(Err(e))) => {
                tracing::error!(policy = self.policy.name(), error = %e, "Auth policy failed, denying");
                AuthDecision::Deny(DenyReason::PolicyFailure(e.to_string()))
            }
            Ok(Err(_)) => {
                tracing::error!(policy = self.policy.name(), "Auth policy panicked, denying");
                AuthDecision::Deny(DenyReason::PolicyFailure("policy panicked".into()))
            }
            Err(_) => {
                tracing::error!(
                    policy = self.policy.name(),
                    timeout = ?self.decision_timeout,
                    "Auth policy timed out, denying"
                );
                AuthDecision::Deny(DenyReason::PolicyTimeout)
            }
        }
    }
}

pub async fn auth_middleware(
    State(interceptor): State<AuthInterceptor>,
    request: Request,
    next: Next,
) -> Response {
    // The policy only gets the head, so it cannot rewrite what the file handler sees.
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    match interceptor.intercept(&parts).await {
        AuthDecision::Allow => {
            tracing::debug!(
                request_id = %request_id,
                method = %parts.method,
                path = %parts.uri.path(),
                "Request allowed"
            );
            metrics::record_auth_decision("allow");
            next.run(Request::from_parts(parts, body)).await
        }
        AuthDecision::Deny(reason) => {
            tracing::warn!(
                request_id = %request_id,
                method = %parts.method,
                path = %parts.uri.path(),
                reason = %reason,
                "Request denied"
            );
            metrics::record_auth_decision(reason.label());
            forbidden()
        }
    }
}
