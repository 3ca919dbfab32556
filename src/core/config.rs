use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_PORT: u16 = 1337;
pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://v6.exchangerate-api.com/v6";

/// Projects whose final budget is always reported in TTD.
pub const DEFAULT_TTD_PROJECTS: [&str; 4] = [
    "Peking roasted duck Chanel",
    "Choucroute Cartier",
    "Rigua Nintendo",
    "Llapingacho Instagram",
];

const ENV_API_KEY: &str = "CURRENCY_API_KEY";
const ENV_PORT: &str = "PORT";
const ENV_DATA_PATH: &str = "BUDGETFX_DATA_PATH";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CurrencyConfig {
    #[serde(default = "default_exchange_rate_url")]
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            base_url: default_exchange_rate_url(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Disk,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default = "default_ttd_projects")]
    pub ttd_projects: Vec<String>,
    #[serde(default)]
    pub storage: StorageKind,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            currency: CurrencyConfig::default(),
            ttd_projects: default_ttd_projects(),
            storage: StorageKind::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config file from the default location when it exists,
    /// then applies environment overrides.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!("No config file at {}, using defaults", config_path.display());
            Self::default()
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "budgetfx", "budgetfx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("org", "budgetfx", "budgetfx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Loads the config file at `path`, then applies environment overrides.
    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `CURRENCY_API_KEY`, `PORT` and `BUDGETFX_DATA_PATH` from
    /// `lookup` over the loaded values. Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = get(ENV_API_KEY) {
            self.currency.api_key = Some(api_key);
        }
        if let Some(port) = get(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {ENV_PORT} value: {port}"))?;
        }
        if let Some(data_path) = get(ENV_DATA_PATH) {
            self.data_path = Some(data_path);
        }
        if self
            .currency
            .api_key
            .as_deref()
            .is_some_and(|k| k.trim().is_empty())
        {
            self.currency.api_key = None;
        }
        Ok(self)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_exchange_rate_url() -> String {
    DEFAULT_EXCHANGE_RATE_URL.to_string()
}

fn default_ttd_projects() -> Vec<String> {
    DEFAULT_TTD_PROJECTS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
server:
  port: 8080
currency:
  base_url: "http://localhost:9000/v6"
  api_key: "secret"
ttd_projects:
  - "Rigua Nintendo"
storage: memory
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.currency.base_url, "http://localhost:9000/v6");
        assert_eq!(config.currency.api_key.as_deref(), Some("secret"));
        assert_eq!(config.ttd_projects, vec!["Rigua Nintendo".to_string()]);
        assert_eq!(config.storage, StorageKind::Memory);
        assert!(config.data_path.is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.currency.base_url, DEFAULT_EXCHANGE_RATE_URL);
        assert!(config.currency.api_key.is_none());
        assert_eq!(config.ttd_projects.len(), 4);
        assert!(
            config
                .ttd_projects
                .contains(&"Peking roasted duck Chanel".to_string())
        );
        assert_eq!(config.storage, StorageKind::Disk);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CURRENCY_API_KEY", "from-env"),
            ("PORT", "3000"),
            ("BUDGETFX_DATA_PATH", "/tmp/budgetfx"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.currency.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.data_path.as_deref(), Some("/tmp/budgetfx"));
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/budgetfx")
        );
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let mut config = AppConfig::default();
        config.currency.api_key = Some("  ".to_string());

        let config = config
            .with_overrides(|key| (key == "CURRENCY_API_KEY").then(String::new))
            .unwrap();
        assert!(config.currency.api_key.is_none());
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let result = AppConfig::default()
            .with_overrides(|key| (key == "PORT").then(|| "not-a-port".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "server:\n  port: 4242\nstorage: memory\n").unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.storage, StorageKind::Memory);
    }
}
