//! Configuration
//!
//! Loaded in layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `AREADB__<SECTION>__<KEY>` environment variables, e.g.
//!    `AREADB__TOKENS__MIN_TTL_SECS=120`

use crate::auth::MIN_TOKEN_TTL_SECS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "AREADB";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub tokens: TokenConfig,
    pub scan: ScanConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Shortest TTL `issue_token` accepts. Never below 60.
    pub min_ttl_secs: u64,
    /// TTL used when the caller does not pick one.
    pub default_ttl_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            min_ttl_secs: MIN_TOKEN_TTL_SECS,
            default_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Keys requested per listing page.
    pub page_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { page_size: 1000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level; `RUST_LOG` directives are added on top.
    pub level: String,
    pub format: LogFormat,
    pub ansi: bool,
    /// Also write daily rotated log files here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            ansi: true,
            log_dir: None,
        }
    }
}

impl DbConfig {
    /// Load defaults, then `path` (if given and present), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(false),
            );
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: DbConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.min_ttl_secs < MIN_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "tokens.min_ttl_secs must be at least {MIN_TOKEN_TTL_SECS}, got {}",
                self.tokens.min_ttl_secs
            )));
        }
        if self.tokens.default_ttl_secs < self.tokens.min_ttl_secs {
            return Err(ConfigError::Invalid(format!(
                "tokens.default_ttl_secs ({}) is below tokens.min_ttl_secs ({})",
                self.tokens.default_ttl_secs, self.tokens.min_ttl_secs
            )));
        }
        if self.scan.page_size == 0 {
            return Err(ConfigError::Invalid(
                "scan.page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
