//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API base URL and the tunables of the request layer. The API key is
//! never written here; it comes from the environment or the OS keychain.
//!
//! Configuration is stored at `~/.config/travelporto/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::ApiKeyStore;
use crate::index::DEFAULT_FAN_OUT_CONCURRENCY;
use crate::realtime::DEFAULT_REFRESH_INTERVAL;
use crate::service::DataSettings;
use crate::tasks::retry::DEFAULT_RETRY_DELAY;

/// Application name used for config directory paths
const APP_NAME: &str = "travelporto";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Saved stops file name
const SAVED_STOPS_FILE: &str = "saved_stops.json";

/// Environment variable overriding the API base URL
pub const ENV_API_BASE_URL: &str = "TRAVELPORTO_API_BASE_URL";

/// Environment variable overriding the keychain API key
pub const ENV_API_KEY: &str = "TRAVELPORTO_API_KEY";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub fan_out_concurrency: Option<usize>,
    pub retry_delay_ms: Option<u64>,
    pub refresh_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    pub fn saved_stops_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(SAVED_STOPS_FILE))
    }

    /// API base URL: environment first, then the config file.
    pub fn base_url(&self) -> Result<String> {
        first_non_empty(std::env::var(ENV_API_BASE_URL).ok(), self.api_base_url.clone()).ok_or_else(|| {
            anyhow::anyhow!(
                "API base URL is not configured - set {} or api_base_url in the config file",
                ENV_API_BASE_URL
            )
        })
    }

    /// API key: environment first, then the OS keychain.
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = first_non_empty(std::env::var(ENV_API_KEY).ok(), None) {
            return Ok(key);
        }
        ApiKeyStore::get().with_context(|| {
            format!("API key is not configured - set {} or run `travelporto set-key`", ENV_API_KEY)
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn data_settings(&self) -> DataSettings {
        DataSettings {
            fan_out_concurrency: self
                .fan_out_concurrency
                .unwrap_or(DEFAULT_FAN_OUT_CONCURRENCY)
                .max(1),
            retry_delay: self
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_RETRY_DELAY),
            refresh_interval: self
                .refresh_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REFRESH_INTERVAL),
        }
    }
}

fn first_non_empty(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .into_iter()
        .chain(fallback)
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_empty() {
        assert_eq!(first_non_empty(Some("a".into()), Some("b".into())).as_deref(), Some("a"));
        assert_eq!(first_non_empty(Some("  ".into()), Some(" b ".into())).as_deref(), Some("b"));
        assert_eq!(first_non_empty(None, None), None);
    }

    #[test]
    fn test_data_settings_defaults_and_overrides() {
        let defaults = Config::default().data_settings();
        assert_eq!(defaults, DataSettings::default());
        assert_eq!(defaults.fan_out_concurrency, 3);
        assert_eq!(defaults.retry_delay, Duration::from_millis(400));
        assert_eq!(defaults.refresh_interval, Duration::from_secs(10));

        let config = Config {
            fan_out_concurrency: Some(0),
            retry_delay_ms: Some(1000),
            refresh_interval_secs: Some(0),
            ..Config::default()
        };
        let settings = config.data_settings();
        assert_eq!(settings.fan_out_concurrency, 1);
        assert_eq!(settings.retry_delay, Duration::from_secs(1));
        assert_eq!(settings.refresh_interval, Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join(CONFIG_FILE);

        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        let config = Config {
            api_base_url: Some("https://api.example.pt".to_string()),
            refresh_interval_secs: Some(15),
            ..Config::default()
        };
        config.save_to(&path).expect("Failed to save config");
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"api_base_url":"https://api.example.pt"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_base_url.as_deref(), Some("https://api.example.pt"));
        assert_eq!(config.fan_out_concurrency, None);

        std::fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
