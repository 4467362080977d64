use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::constants;
use crate::error::{CheckError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub check: CheckConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_url")]
    pub url: String,
    #[serde(default = "default_api_app")]
    pub app: String,
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,
    /// Log request and response bodies at debug level
    #[serde(default)]
    pub debug: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            url: default_api_url(),
            app: default_api_app(),
            timeout_seconds: default_api_timeout(),
            debug: false,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckConfig {
    /// When false the manager performs no API calls; a submission URL must then be supplied.
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub submission_url: Option<String>,
    /// Numeric check id (not check bundle id), 0 when unset
    #[serde(default)]
    pub id: u64,
    pub instance_id: Option<String>,
    pub search_tag: Option<String>,
    pub secret: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub display_name: Option<String>,
    #[serde(default = "default_check_type", rename = "type")]
    pub check_type: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            submission_url: None,
            id: 0,
            instance_id: None,
            search_tag: None,
            secret: None,
            tags: Vec::new(),
            display_name: None,
            check_type: default_check_type(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub id: Option<u64>,
    pub select_tag: Option<String>,
    #[serde(default = "default_broker_max_response")]
    pub max_response_time_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            id: None,
            select_tag: None,
            max_response_time_ms: default_broker_max_response(),
        }
    }
}

impl BrokerConfig {
    pub fn max_response_time(&self) -> Duration {
        Duration::from_millis(self.max_response_time_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_true")]
    pub json_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            json_file: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    constants::DEFAULT_API_URL.to_string()
}

fn default_api_app() -> String {
    constants::DEFAULT_API_APP.to_string()
}

fn default_api_timeout() -> u64 {
    constants::DEFAULT_API_TIMEOUT_SECS
}

fn default_check_type() -> String {
    constants::DEFAULT_CHECK_TYPE.to_string()
}

fn default_broker_max_response() -> u64 {
    constants::DEFAULT_BROKER_MAX_RESPONSE_MS
}

fn default_log_dir() -> String {
    constants::DEFAULT_LOG_DIR.to_string()
}

impl Config {
    /// Load `checkmgr.toml` from the working directory, then apply env overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(constants::DEFAULT_CONFIG_PATH)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_content = fs::read_to_string(path).map_err(|e| {
            CheckError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config = Self::from_toml_str(&config_content)?.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var(constants::ENV_API_TOKEN) {
            self.api.token = token;
        }
        if let Ok(url) = std::env::var(constants::ENV_API_URL) {
            self.api.url = url;
        }
        if let Ok(app) = std::env::var(constants::ENV_API_APP) {
            self.api.app = app;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.check.enabled && self.api.token.trim().is_empty() {
            return Err(CheckError::Config(
                "API token is required when the check manager is enabled".to_string(),
            ));
        }
        if !self.check.enabled
            && self
                .check
                .submission_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(CheckError::Config(
                "a submission URL is required when the check manager is disabled".to_string(),
            ));
        }
        if self.api.timeout_seconds == 0 {
            return Err(CheckError::Config("api.timeout_seconds must be greater than 0".to_string()));
        }
        Ok(())
    }
}
