// File: viprestore/src/config/secrets.rs
//! Controller credentials.
//!
//! Credentials live in `config/secrets.toml`, which should be kept out of
//! version control:
//! ```toml
//! [systems.studio]
//! username = "operator"
//! password = "secret"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::remote::Credentials;

#[derive(Debug, Deserialize)]
struct SystemSecret {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize, Default)]
struct SecretsFile {
    #[serde(default)]
    systems: HashMap<String, SystemSecret>,
}

pub struct SecretsLoader {
    secrets: SecretsFile,
}

impl SecretsLoader {
    /// Load credentials from `secrets_path`. A missing file yields an empty loader.
    pub fn load(secrets_path: &Path) -> Result<Self> {
        if !secrets_path.exists() {
            warn!(
                "Secrets file not found at {:?}, controller logins will fail until credentials are configured",
                secrets_path
            );
            return Ok(Self {
                secrets: SecretsFile::default(),
            });
        }

        let content = std::fs::read_to_string(secrets_path)
            .with_context(|| format!("Failed to read secrets file: {:?}", secrets_path))?;

        let secrets: SecretsFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse secrets file: {:?}", secrets_path))?;

        info!(
            "Loaded credentials for {} systems from {:?}",
            secrets.systems.len(),
            secrets_path
        );

        Ok(Self { secrets })
    }

    pub fn credentials(&self, system: &str) -> Option<Credentials> {
        self.secrets
            .systems
            .get(system)
            .map(|s| Credentials::new(&s.username, &s.password))
    }
}
