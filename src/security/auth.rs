//! Authentication decision contract.
//!
//! # Responsibilities
//! - Define the per-request decision (`AuthDecision`)
//! - Define the pluggable policy seam (`AuthPolicy`)
//! - Build the configured policy at startup
//!
//! # Design Decisions
//! - Policies only see the request head by shared reference
//! - A policy error is a value, not a response; the interceptor maps it to Deny

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::request::Parts;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::security::credentials::{AllowAll, BasicAuth, BearerToken};

/// Outcome of evaluating a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Deny(DenyReason),
}

/// Why a request was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No `Authorization` header.
    MissingCredentials,
    /// `Authorization` uses a scheme the policy does not accept.
    UnsupportedScheme,
    /// Credentials could not be decoded.
    MalformedCredentials,
    /// Credentials decoded but did not match.
    InvalidCredentials,
    /// The policy itself failed; the request is denied.
    PolicyFailure(String),
    /// The policy did not answer in time.
    PolicyTimeout,
}

impl DenyReason {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DenyReason::MissingCredentials => "missing_credentials",
            DenyReason::UnsupportedScheme => "unsupported_scheme",
            DenyReason::MalformedCredentials => "malformed_credentials",
            DenyReason::InvalidCredentials => "invalid_credentials",
            DenyReason::PolicyFailure(_) => "policy_failure",
            DenyReason::PolicyTimeout => "policy_timeout",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::PolicyFailure(cause) => write!(f, "policy failure: {}", cause),
            other => f.write_str(&other.label().replace('_', " ")),
        }
    }
}

/// Failure inside a policy's decision logic.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// A backing store (credential cache, identity provider) is unreachable.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("internal policy error: {0}")]
    Internal(String),
}

/// Pluggable authentication policy.
///
/// Implementations decide from the request head alone. Returning `Err` is
/// always treated as a denial.
#[async_trait]
pub trait AuthPolicy: Send + Sync + 'static {
    async fn decide(&self, request: &Parts) -> Result<AuthDecision, AuthError>;

    /// Name used in startup logs.
    fn name(&self) -> &'static str;
}

/// Build the policy selected by `[auth] mode`.
pub fn policy_from_config(config: &AuthConfig) -> Arc<dyn AuthPolicy> {
    match config {
        AuthConfig::None => Arc::new(AllowAll),
        AuthConfig::Basic { username, password } => {
            Arc::new(BasicAuth::new(username.clone(), password.clone()))
        }
        AuthConfig::Bearer { tokens } => Arc::new(BearerToken::new(tokens.iter().cloned())),
    }
}
