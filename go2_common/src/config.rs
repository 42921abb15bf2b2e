//! TOML configuration: the `[shared]` table and a blanket loader.
//!
//! ```rust,no_run
//! use go2_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct SimAppConfig {
//!     shared: SharedConfig,
//!     period_us: u64,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = SimAppConfig::load(Path::new("sim.toml"))?;
//!     config.shared.validate()?;
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to obtain a usable configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// File exists but could not be read.
    #[error("cannot read configuration {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    /// TOML syntax or shape error.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Values parsed but break a rule.
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Default verbosity when neither `-v` nor `RUST_LOG` is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// `[shared]` table carried by every go2 binary's configuration.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "go2-lowlevel-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default)]
    pub log_level: LogLevel,
    /// Instance name used in log lines.
    pub service_name: String,
}

impl SharedConfig {
    pub fn named(service_name: &str) -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: service_name.to_string(),
        }
    }

    /// # Errors
    /// `ConfigError::ValidationError` for a blank `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "shared.service_name must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// TOML loading for any deserializable configuration type.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// # Errors
    /// `FileNotFound` for a missing file, `Io` for other read failures,
    /// `ParseError` for malformed TOML.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
            _ => ConfigError::Io {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;
        Self::parse(&content)
    }

    /// # Errors
    /// `ConfigError::ParseError` carrying the TOML diagnostic.
    fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
