// File: viprestore/src/config/mod.rs
pub mod manager;
pub mod secrets;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::constants::{batch, defaults};
use crate::errors::ConfigError;
use crate::remote::Credentials;

pub use manager::ConfigManager;
pub use secrets::SecretsLoader;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub default_system: Option<String>,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    pub log_file: Option<String>,
    // Populated from the per-system config files and secrets.toml
    #[serde(skip)]
    pub systems: HashMap<String, SystemConfig>,
}

fn default_max_concurrent_requests() -> usize {
    batch::DEFAULT_MAX_CONCURRENCY
}

fn default_request_timeout() -> u64 {
    defaults::REQUEST_TIMEOUT_SECONDS
}

fn default_connect_timeout() -> u64 {
    defaults::CONNECT_TIMEOUT_SECONDS
}

fn default_verify_ssl() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub base_url: String,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfigFile {
    pub controller: ControllerConfig,
}

/// One controller system, named after its config file
#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub name: String,
    pub controller: ControllerConfig,
    pub credentials: Option<Credentials>,
}

impl SystemConfig {
    pub fn credentials(&self) -> Result<&Credentials, ConfigError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| ConfigError::MissingCredentials {
                system: self.name.clone(),
            })
    }
}

impl Config {
    /// Resolve a system by name, falling back to `default_system`.
    pub fn system(&self, name: Option<&str>) -> Result<&SystemConfig, ConfigError> {
        let name = match name {
            Some(name) => name,
            None => self
                .default_system
                .as_deref()
                .ok_or(ConfigError::NoDefaultSystem)?,
        };

        self.systems
            .get(name)
            .ok_or_else(|| ConfigError::UnknownSystem {
                name: name.to_string(),
            })
    }

    pub fn system_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.systems.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}
