//! Configuration loading from disk and the command line.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::cli::Cli;
use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML configuration file without validating it.
pub fn read_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Build the runtime configuration: file (if any), then CLI overrides, then
/// validation. The site root is canonicalised on success.
pub fn load_config(cli: &Cli) -> Result<ServerConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ServerConfig::default(),
    };

    if let Some(root) = &cli.site_root {
        config.site.root = root.clone();
    }
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    config.site.root = canonical_root(&config.site.root)?;

    Ok(config)
}

/// Resolve the site root to an absolute path. The root can disappear between
/// validation and this call; that is reported like any other bad root.
fn canonical_root(root: &Path) -> Result<PathBuf, ConfigError> {
    root.canonicalize().map_err(|e| {
        ConfigError::Validation(vec![ValidationError::SiteRootUnreadable {
            path: root.to_path_buf(),
            reason: e.to_string(),
        }])
    })
}
