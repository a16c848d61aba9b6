//! Engine configuration module
//!
//! Configuration is a TOML document. Every section has defaults, so an empty
//! document (or no file at all) yields a runnable local configuration.
//!
//! ```toml
//! environment = "production"
//! log_level = "info"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 9000
//! public_path = "public"
//!
//! [push]
//! fan_out = true
//! bus_url = "redis://127.0.0.1:6379"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deployment environment name, attached to logs
    pub environment: String,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub server: ServerConfig,
    pub protocol: ProtocolConfig,
    pub push: PushConfig,
    pub store: StoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            server: ServerConfig::default(),
            protocol: ProtocolConfig::default(),
            push: PushConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load the configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::parse(&input)
    }

    /// Parse the configuration from TOML.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::MissingValue("log_level"));
        }
        self.server.validate()?;
        self.protocol.validate()?;
        self.push.validate()?;
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served under `/<public_path>/`
    pub public_path: String,
    /// Bound on draining in-flight requests at shutdown
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9000,
            public_path: "public".to_string(),
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.public_path.trim().is_empty() {
            return Err(ConfigError::MissingValue("server.public_path"));
        }
        // Served under `/<public_path>`; the root itself is taken by the routes.
        if self.public_path.trim().trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid(format!(
                "server.public_path {:?} must name a directory below the root",
                self.public_path
            )));
        }
        Ok(())
    }
}

/// Per-connection and per-endpoint rate limits, in requests per second
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub connection_rate_limit: u32,
    pub unauthenticated_rate_limit: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            connection_rate_limit: 500,
            unauthenticated_rate_limit: 10,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection_rate_limit == 0 {
            return Err(ConfigError::Invalid("protocol.connection_rate_limit must be positive".into()));
        }
        if self.unauthenticated_rate_limit == 0 {
            return Err(ConfigError::Invalid(
                "protocol.unauthenticated_rate_limit must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Cross-process push fan-out
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub fan_out: bool,
    /// `redis://...` for a Redis broker, `local` for an in-process bus
    pub bus_url: String,
}

impl PushConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fan_out && self.bus_url.trim().is_empty() {
            return Err(ConfigError::MissingValue("push.bus_url"));
        }
        Ok(())
    }
}

/// Relational store connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: Option<String>,
}

impl StoreConfig {
    /// `DATABASE_URL` wins over the file value.
    pub fn resolve_database_url(&self) -> Option<String> {
        std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .or_else(|| self.database_url.clone())
    }
}

/// Client transport settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `ws://` or `wss://` endpoint URL
    pub address: String,
    /// How long a request waits for its response
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: Duration::from_secs(10 * 60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.address.starts_with("ws://") && !self.address.starts_with("wss://") {
            return Err(ConfigError::InvalidUrl(format!(
                "invalid address {:?}, please include protocol. ex: ws://",
                self.address
            )));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value: {0}")]
    Invalid(String),
    #[error("failed to read config: {0}")]
    Io(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
}
