//! Built-in authentication policies.

use async_trait::async_trait;
use axum::http::{header, request::Parts};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::security::auth::{AuthDecision, AuthError, AuthPolicy, DenyReason};

/// Lets every request through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl AuthPolicy for AllowAll {
    async fn decide(&self, _request: &Parts) -> Result<AuthDecision, AuthError> {
        Ok(AuthDecision::Allow)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// HTTP Basic authentication against a single static credential pair.
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl AuthPolicy for BasicAuth {
    async fn decide(&self, request: &Parts) -> Result<AuthDecision, AuthError> {
        let encoded = match authorization(request, "Basic") {
            Ok(value) => value,
            Err(reason) => return Ok(AuthDecision::Deny(reason)),
        };

        let decoded = match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(AuthDecision::Deny(DenyReason::MalformedCredentials)),
        };
        let decoded = match String::from_utf8(decoded) {
            Ok(s) => s,
            Err(_) => return Ok(AuthDecision::Deny(DenyReason::MalformedCredentials)),
        };
        let Some((user, pass)) = decoded.split_once(':') else {
            return Ok(AuthDecision::Deny(DenyReason::MalformedCredentials));
        };

        // Evaluate both comparisons so a wrong username costs the same as a wrong password.
        let user_ok = constant_time_eq(user.as_bytes(), self.username.as_bytes());
        let pass_ok = constant_time_eq(pass.as_bytes(), self.password.as_bytes());
        if user_ok & pass_ok {
            Ok(AuthDecision::Allow)
        } else {
            Ok(AuthDecision::Deny(DenyReason::InvalidCredentials))
        }
    }

    fn name(&self) -> &'static str {
        "basic"
    }
}

/// `Authorization: Bearer <token>` against a fixed token set.
#[derive(Clone)]
pub struct BearerToken {
    tokens: Vec<String>,
}

impl BearerToken {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens.into_iter().filter(|t| !t.is_empty()).collect(),
        }
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

#[async_trait]
impl AuthPolicy for BearerToken {
    async fn decide(&self, request: &Parts) -> Result<AuthDecision, AuthError> {
        let presented = match authorization(request, "Bearer") {
            Ok(value) => value.trim(),
            Err(reason) => return Ok(AuthDecision::Deny(reason)),
        };
        if presented.is_empty() {
            return Ok(AuthDecision::Deny(DenyReason::MalformedCredentials));
        }

        let matched = self
            .tokens
            .iter()
            .fold(false, |acc, t| acc | constant_time_eq(presented.as_bytes(), t.as_bytes()));
        if matched {
            Ok(AuthDecision::Allow)
        } else {
            Ok(AuthDecision::Deny(DenyReason::InvalidCredentials))
        }
    }

    fn name(&self) -> &'static str {
        "bearer"
    }
}

/// Extract the credentials part of `Authorization: <scheme> <credentials>`.
/// The scheme is matched case-insensitively.
fn authorization<'a>(request: &'a Parts, scheme: &str) -> Result<&'a str, DenyReason> {
    let value = request
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(DenyReason::MissingCredentials)?
        .to_str()
        .map_err(|_| DenyReason::MalformedCredentials)?;

    let (given, rest) = value.split_once(' ').ok_or(DenyReason::UnsupportedScheme)?;
    if !given.eq_ignore_ascii_case(scheme) {
        return Err(DenyReason::UnsupportedScheme);
    }
    Ok(rest)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
