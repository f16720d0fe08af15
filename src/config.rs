use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default endpoint of the answering service
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default ceiling for a single chat request
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding the service base URL
pub const API_URL_ENV: &str = "EDUBOT_API_URL";

/// Environment variable overriding the request timeout
pub const TIMEOUT_ENV: &str = "EDUBOT_TIMEOUT_SECS";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Answering service settings
    pub api: ApiConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// Log output
    pub logging: LoggingConfig,

    /// EduBot home directory
    #[serde(skip)]
    pub edubot_home: PathBuf,
}

/// Remote service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Show the `n/500` counter under the composer
    pub show_char_counter: bool,
    /// Probe `/health` when the interactive client starts
    pub health_check_on_start: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Directory for the interactive client's log files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    /// Ceiling for a single chat request
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_char_counter: true,
            health_check_on_start: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            api: ApiConfig::default(),
            ui: UiConfig::default(),
            logging: LoggingConfig::default(),
            edubot_home: home.join(".edubot"),
        }
    }
}

impl Config {
    /// Load configuration from `~/.edubot/config.toml` and apply environment overrides
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let edubot_home = home.join(".edubot");

        let mut config = Self::load_from(&edubot_home.join("config.toml"))?;
        config.edubot_home = edubot_home;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Load configuration from a specific file, falling back to defaults when it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Serialize the effective configuration
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Apply environment-level overrides through a lookup function
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            self.api.timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds, got {:?}", TIMEOUT_ENV, raw))?;
        }

        Ok(())
    }

    /// Apply command-line flags, which take precedence over everything else
    pub fn apply_cli_overrides(&mut self, base_url: Option<String>, timeout_secs: Option<u64>) {
        if let Some(url) = base_url {
            self.api.base_url = url;
        }
        if let Some(secs) = timeout_secs {
            self.api.timeout_secs = secs;
        }
    }

    /// Directory that receives the interactive client's log files
    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .directory
            .clone()
            .unwrap_or_else(|| self.edubot_home.join("logs"))
    }
}
