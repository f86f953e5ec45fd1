//! Test configuration builder writing a config directory into a temp dir

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestConfigBuilder {
    temp_dir: TempDir,
    main: MainConfigBuilder,
    systems: BTreeMap<String, SystemBuilder>,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            main: MainConfigBuilder::default(),
            systems: BTreeMap::new(),
        }
    }

    pub fn with_main_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(MainConfigBuilder) -> MainConfigBuilder,
    {
        self.main = f(self.main);
        self
    }

    pub fn with_system<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(SystemBuilder) -> SystemBuilder,
    {
        self.systems
            .insert(name.to_string(), f(SystemBuilder::default()));
        self
    }

    pub fn build(self) -> TestConfig {
        let config_dir = self.temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        fs::write(config_dir.join("main.toml"), self.main.to_toml())
            .expect("Failed to write main.toml");

        let mut secrets = String::new();
        for (name, system) in &self.systems {
            fs::write(config_dir.join(format!("{}.toml", name)), system.to_toml())
                .expect("Failed to write system config");
            if let Some((username, password)) = &system.credentials {
                secrets.push_str(&format!(
                    "[systems.{}]\nusername = \"{}\"\npassword = \"{}\"\n\n",
                    name, username, password
                ));
            }
        }
        if !secrets.is_empty() {
            fs::write(config_dir.join("secrets.toml"), secrets).expect("Failed to write secrets.toml");
        }

        TestConfig {
            _temp_dir: self.temp_dir,
            config_dir,
        }
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Default)]
pub struct MainConfigBuilder {
    default_system: Option<String>,
    max_concurrent_requests: Option<usize>,
    request_timeout_seconds: Option<u64>,
}

impl MainConfigBuilder {
    pub fn default_system(mut self, name: &str) -> Self {
        self.default_system = Some(name.to_string());
        self
    }

    pub fn max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = Some(limit);
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_seconds = Some(seconds);
        self
    }

    fn to_toml(&self) -> String {
        let mut toml = String::new();
        if let Some(name) = &self.default_system {
            toml.push_str(&format!("default_system = \"{}\"\n", name));
        }
        if let Some(limit) = self.max_concurrent_requests {
            toml.push_str(&format!("max_concurrent_requests = {}\n", limit));
        }
        if let Some(seconds) = self.request_timeout_seconds {
            toml.push_str(&format!("request_timeout_seconds = {}\n", seconds));
        }
        toml
    }
}

pub struct SystemBuilder {
    base_url: String,
    verify_ssl: Option<bool>,
    description: Option<String>,
    credentials: Option<(String, String)>,
}

impl Default for SystemBuilder {
    fn default() -> Self {
        Self {
            base_url: "https://controller.local".to_string(),
            verify_ssl: None,
            description: None,
            credentials: Some(("operator".to_string(), "secret".to_string())),
        }
    }
}

impl SystemBuilder {
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = Some(verify);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn without_credentials(mut self) -> Self {
        self.credentials = None;
        self
    }

    fn to_toml(&self) -> String {
        let mut toml = format!("[controller]\nbase_url = \"{}\"\n", self.base_url);
        if let Some(verify) = self.verify_ssl {
            toml.push_str(&format!("verify_ssl = {}\n", verify));
        }
        if let Some(description) = &self.description {
            toml.push_str(&format!("description = \"{}\"\n", description));
        }
        toml
    }
}

pub struct TestConfig {
    _temp_dir: TempDir,
    pub config_dir: PathBuf,
}
