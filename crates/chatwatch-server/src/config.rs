//! Server configuration.

use anyhow::{bail, Result};
use chatwatch_core::{DebounceWindows, PhoneFormat, DEFAULT_AREA_CODES, DEFAULT_BASE_URL, DEFAULT_MODEL};
use chatwatch_types::{MAX_NOTIFICATION_INTERVAL, MIN_NOTIFICATION_INTERVAL};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Where runtime settings are persisted as JSON.
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Used when no settings file exists yet.
    #[serde(default = "default_inactivity_threshold")]
    pub inactivity_threshold_minutes: u32,
    #[serde(default = "default_cooldown_secs")]
    pub notification_cooldown_secs: u64,
    #[serde(default)]
    pub phone_format: PhoneFormat,
    #[serde(default = "default_area_codes")]
    pub area_codes: Vec<String>,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    /// Fallback credential when settings carry none.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub debounce: DebounceWindows,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_settings_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatwatch")
        .join("settings.json")
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_inactivity_threshold() -> u32 {
    chatwatch_types::DEFAULT_NOTIFICATION_INTERVAL
}

fn default_cooldown_secs() -> u64 {
    300
}

fn default_area_codes() -> Vec<String> {
    DEFAULT_AREA_CODES.iter().map(|c| c.to_string()).collect()
}

fn default_gemini_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            settings_path: default_settings_path(),
            poll_interval_secs: default_poll_interval_secs(),
            inactivity_threshold_minutes: default_inactivity_threshold(),
            notification_cooldown_secs: default_cooldown_secs(),
            phone_format: PhoneFormat::default(),
            area_codes: default_area_codes(),
            gemini_base_url: default_gemini_base_url(),
            gemini_model: default_gemini_model(),
            api_key: None,
            debounce: DebounceWindows::default(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location (config/default.toml) or fall back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("config/default.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        Ok(Config::default())
    }

    /// Reject values the rest of the server cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.area_codes.is_empty() {
            bail!("area_codes must list at least one code");
        }
        if !(MIN_NOTIFICATION_INTERVAL..=MAX_NOTIFICATION_INTERVAL)
            .contains(&self.inactivity_threshold_minutes)
        {
            bail!(
                "inactivity_threshold_minutes must be between {} and {}, got {}",
                MIN_NOTIFICATION_INTERVAL,
                MAX_NOTIFICATION_INTERVAL,
                self.inactivity_threshold_minutes
            );
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be positive");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn notification_cooldown(&self) -> Duration {
        Duration::from_secs(self.notification_cooldown_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8787);
        assert_eq!(config.inactivity_threshold_minutes, 20);
        assert_eq!(config.notification_cooldown(), Duration::from_secs(300));
        assert_eq!(config.area_codes.len(), 8);
        assert_eq!(config.phone_format, PhoneFormat::Compact);
        assert!(config.settings_path.ends_with("chatwatch/settings.json"));
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            port = 9000
            phone_format = "international"
            area_codes = ["707", "777"]

            [debounce]
            input_ms = 1500
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.phone_format, PhoneFormat::International);
        assert_eq!(config.area_codes, vec!["707", "777"]);
        assert_eq!(config.debounce.input_ms, 1500);
        assert_eq!(config.debounce.mutation_ms, 500);
        assert_eq!(config.gemini_model, "gemini-1.5-flash-latest");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.area_codes.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.inactivity_threshold_minutes = 90;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatwatch.toml");
        std::fs::write(&path, "port = 1234\ninactivity_threshold_minutes = 18\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.port, 1234);
        assert_eq!(config.inactivity_threshold_minutes, 18);

        std::fs::write(&path, "area_codes = []\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
