//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that the site root is a readable directory
//! - Validate value ranges (timeouts > 0, connection limit > 0)
//! - Check that the selected auth mode has usable credentials
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - The site root is checked eagerly at startup, not on first request
//! - Runs before config is accepted into the system

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::schema::{AuthConfig, ServerConfig};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("site root is not set (use --site-root)")]
    MissingSiteRoot,

    #[error("site root {0} does not exist")]
    SiteRootNotFound(PathBuf),

    #[error("site root {0} is not a directory")]
    SiteRootNotDirectory(PathBuf),

    #[error("site root {path} is not readable: {reason}")]
    SiteRootUnreadable { path: PathBuf, reason: String },

    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("auth.username must not be empty in basic mode")]
    EmptyUsername,

    #[error("auth.tokens must contain at least one non-empty token in bearer mode")]
    NoBearerTokens,
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = check_site_root(&config.site.root) {
        errors.push(e);
    }

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("read_secs", timeouts.read_secs),
        ("write_secs", timeouts.write_secs),
        ("idle_secs", timeouts.idle_secs),
        ("auth_secs", timeouts.auth_secs),
        ("shutdown_secs", timeouts.shutdown_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    match &config.auth {
        AuthConfig::None => {}
        AuthConfig::Basic { username, .. } => {
            if username.is_empty() {
                errors.push(ValidationError::EmptyUsername);
            }
        }
        AuthConfig::Bearer { tokens } => {
            if tokens.iter().all(|t| t.is_empty()) {
                errors.push(ValidationError::NoBearerTokens);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_site_root(root: &std::path::Path) -> Result<(), ValidationError> {
    if root.as_os_str().is_empty() {
        return Err(ValidationError::MissingSiteRoot);
    }
    let meta = fs::metadata(root).map_err(|_| ValidationError::SiteRootNotFound(root.to_path_buf()))?;
    if !meta.is_dir() {
        return Err(ValidationError::SiteRootNotDirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|e| ValidationError::SiteRootUnreadable {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}
