use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::permission::PermissionConfig;
use crate::recognition::{SourceConfig, Symbology};
use crate::session::{DebouncePolicy, SessionConfig};

/// Environment variable prefix; `SCANNER__SERVICE__HTTP__PORT=9000` overrides `service.http.port`
pub const ENV_PREFIX: &str = "SCANNER";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub permission: PermissionConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub debounce: DebouncePolicy,
    pub permission_timeout_ms: Option<u64>,
    pub symbologies: Vec<Symbology>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            debounce: DebouncePolicy::default(),
            permission_timeout_ms: None,
            symbologies: Symbology::ALL.to_vec(),
        }
    }
}

impl ScannerConfig {
    /// Session settings for a fresh session id
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            debounce: self.debounce,
            symbologies: self.symbologies.clone(),
            permission_timeout: self.permission_timeout_ms.map(Duration::from_millis),
            ..SessionConfig::default()
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config '{}'", path))?;

        settings
            .try_deserialize()
            .context("Invalid scanner configuration")
    }
}
