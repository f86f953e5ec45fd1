// File: viprestore/src/config/manager.rs
use super::{Config, SecretsLoader, SystemConfig, SystemConfigFile};
use anyhow::{anyhow, Context, Result};
use glob::glob;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::constants::defaults::{MAIN_CONFIG_FILE, SECRETS_FILE};

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: impl AsRef<Path>) -> Result<Self> {
        let config = Self::load_configuration(config_dir.as_ref()).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &Path) -> Result<Config> {
        let main_config_path = config_dir.join(MAIN_CONFIG_FILE);
        let main_config_content = fs::read_to_string(&main_config_path)
            .await
            .with_context(|| format!("Failed to read main config {}", main_config_path.display()))?;

        let mut config: Config = toml::from_str(&main_config_content)
            .map_err(|e| anyhow!("Failed to parse main config: {}", e))?;

        let secrets = SecretsLoader::load(&config_dir.join(SECRETS_FILE))?;

        let pattern = format!("{}/*.toml", config_dir.display());
        let mut systems = HashMap::new();

        for entry in glob(&pattern).map_err(|e| anyhow!("Glob pattern error: {}", e))? {
            let path = entry.map_err(|e| anyhow!("Glob entry error: {}", e))?;
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("Invalid filename"))?;

            if filename == MAIN_CONFIG_FILE || filename == SECRETS_FILE {
                continue;
            }

            let system_name = filename
                .strip_suffix(".toml")
                .ok_or_else(|| anyhow!("Invalid config filename: {}", filename))?;

            debug!("Loading system config: {}", path.display());

            let content = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;

            let file: SystemConfigFile = toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;

            let credentials = secrets.credentials(system_name);
            if credentials.is_none() {
                warn!("No credentials configured for system {}", system_name);
            }

            systems.insert(
                system_name.to_string(),
                SystemConfig {
                    name: system_name.to_string(),
                    controller: file.controller,
                    credentials,
                },
            );
        }

        config.systems = systems;

        if let Some(default) = &config.default_system {
            if !config.systems.contains_key(default) {
                warn!("default_system '{}' has no config file", default);
            }
        }

        info!(
            "Loaded {} controller systems (max {} concurrent requests)",
            config.systems.len(),
            config.max_concurrent_requests
        );

        Ok(config)
    }
}
