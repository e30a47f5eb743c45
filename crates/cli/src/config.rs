use anyhow::{anyhow, Context, Result};
use json_file_adapter::LocalConfig;
use remote_adapter::RemoteConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "WATER_BILLS_CONFIG";
pub const TOKEN_ENV: &str = "WATER_BILLS_TOKEN";
pub const DEFAULT_CONFIG_PATH: &str = "water-bills.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Local,
    Remote,
}

/// Application configuration, built once at startup and handed to the
/// selected storage backend.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: Backend,
    pub local: LocalConfig,
    pub remote: RemoteConfig,
}

/// Loads the configuration.
///
/// An explicitly given path must exist. Without one, the default file is
/// used when present and built-in defaults otherwise.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut cfg = match explicit {
        Some(path) => load_from_file(path)?,
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_path.is_file() {
                load_from_file(&default_path)?
            } else {
                AppConfig::default()
            }
        }
    };
    cfg.normalize_and_validate(std::env::var(TOKEN_ENV).ok())?;
    Ok(cfg)
}

pub fn load_from_file(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    from_toml_str(&content).with_context(|| format!("invalid config file {}", path.display()))
}

pub fn from_toml_str(content: &str) -> Result<AppConfig> {
    Ok(toml::from_str(content)?)
}

impl AppConfig {
    /// Fills the remote token from the environment when the file leaves it
    /// empty, then checks the settings the selected backend needs.
    pub fn normalize_and_validate(&mut self, env_token: Option<String>) -> Result<()> {
        if self.remote.token.trim().is_empty() {
            if let Some(token) = env_token {
                self.remote.token = token;
            }
        }
        self.remote.token = self.remote.token.trim().to_string();
        self.remote.owner = self.remote.owner.trim().to_string();
        self.remote.repo = self.remote.repo.trim().to_string();

        match self.backend {
            Backend::Local => self.validate_local(),
            Backend::Remote => self.validate_remote(),
        }
    }

    fn validate_local(&self) -> Result<()> {
        if self.local.data_dir.as_os_str().is_empty() {
            return Err(anyhow!("local.data_dir must not be empty"));
        }
        Ok(())
    }

    fn validate_remote(&self) -> Result<()> {
        if self.remote.owner.is_empty() || self.remote.repo.is_empty() {
            return Err(anyhow!("remote.owner and remote.repo are required for the remote backend"));
        }
        if self.remote.token.is_empty() {
            return Err(anyhow!(
                "remote.token is empty; set it in the config file or in {TOKEN_ENV}"
            ));
        }
        let api_url = &self.remote.api_url;
        if !(api_url.starts_with("https://") || api_url.starts_with("http://")) {
            return Err(anyhow!("remote.api_url must be an http(s) URL"));
        }
        if self.remote.timeout_secs == 0 {
            return Err(anyhow!("remote.timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}
