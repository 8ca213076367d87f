use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging::LogConfig;
use crate::models::{parse_time_of_day, SleepSettings};
use crate::provider::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT};

/// Directory under the home directory holding config and data
pub const APP_DIR: &str = ".sleeprs";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Tracker preferences
    pub settings: SleepSettings,

    /// Where records are persisted
    pub storage: StorageSettings,

    /// External advice provider
    pub advisor: AdvisorConfig,

    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Record storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// JSON file holding all sleep records
    pub records_path: PathBuf,
}

/// Advice provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Ask the provider at all; when false only built-in advice is used
    pub enabled: bool,

    /// Model name passed to the provider
    pub model: String,

    /// API base URL
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl AdvisorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            metadata: ConfigMetadata::default(),
            settings: SleepSettings::default(),
            storage: StorageSettings::default(),
            advisor: AdvisorConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();
        ConfigMetadata {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            records_path: app_dir().join("records.json"),
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        AdvisorConfig {
            enabled: true,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// `~/.sleeprs`, or `./.sleeprs` when no home directory is known
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Keys accepted by [`AppConfig::get_value`] and [`AppConfig::set_value`]
pub const CONFIG_KEYS: &[&str] = &[
    "settings.sleep_goal_hours",
    "settings.bedtime_reminder",
    "settings.enable_notifications",
    "storage.records_path",
    "advisor.enabled",
    "advisor.model",
    "advisor.base_url",
    "advisor.api_key_env",
    "advisor.timeout_secs",
    "logging.level",
    "logging.format",
];

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        app_dir().join("config.toml")
    }

    /// Load configuration, using defaults when the file does not exist.
    ///
    /// A file that exists but cannot be parsed is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Read a setting by dotted key
    pub fn get_value(&self, key: &str) -> Result<String> {
        let value = match key {
            "settings.sleep_goal_hours" => self.settings.sleep_goal_hours.to_string(),
            "settings.bedtime_reminder" => {
                self.settings.bedtime_reminder.format("%H:%M").to_string()
            }
            "settings.enable_notifications" => self.settings.enable_notifications.to_string(),
            "storage.records_path" => self.storage.records_path.display().to_string(),
            "advisor.enabled" => self.advisor.enabled.to_string(),
            "advisor.model" => self.advisor.model.clone(),
            "advisor.base_url" => self.advisor.base_url.clone(),
            "advisor.api_key_env" => self.advisor.api_key_env.clone(),
            "advisor.timeout_secs" => self.advisor.timeout_secs.to_string(),
            "logging.level" => self.logging.level.to_filter(),
            "logging.format" => format!("{:?}", self.logging.format).to_lowercase(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Update a setting by dotted key, validating the value
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "settings.sleep_goal_hours" => {
                let hours: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid number of hours: {}", value))?;
                if !(hours > 0.0 && hours <= 24.0) {
                    bail!("Sleep goal must be between 0 and 24 hours, got {}", hours);
                }
                self.settings.sleep_goal_hours = hours;
            }
            "settings.bedtime_reminder" => {
                self.settings.bedtime_reminder = parse_time_of_day(value)?;
            }
            "settings.enable_notifications" => {
                self.settings.enable_notifications = parse_bool(value)?
            }
            "storage.records_path" => self.storage.records_path = PathBuf::from(value),
            "advisor.enabled" => self.advisor.enabled = parse_bool(value)?,
            "advisor.model" => self.advisor.model = non_empty(key, value)?,
            "advisor.base_url" => self.advisor.base_url = non_empty(key, value)?,
            "advisor.api_key_env" => self.advisor.api_key_env = non_empty(key, value)?,
            "advisor.timeout_secs" => {
                self.advisor.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout: {}", value))?;
            }
            "logging.level" => self.logging.level = value.parse().map_err(|e: String| anyhow!(e))?,
            "logging.format" => {
                self.logging.format = value.parse().map_err(|e: String| anyhow!(e))?
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Every known key with its current value
    pub fn list_values(&self) -> Vec<(&'static str, String)> {
        CONFIG_KEYS
            .iter()
            .filter_map(|key| self.get_value(key).ok().map(|value| (*key, value)))
            .collect()
    }
}

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow!(
        "Unknown configuration key '{}'. Known keys: {}",
        key,
        CONFIG_KEYS.join(", ")
    )
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("Invalid boolean: {}", value),
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        bail!("{} cannot be empty", key);
    }
    Ok(value.to_string())
}
