use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub extension: ExtensionConfig,

    #[serde(default)]
    pub intelligence: IntelligenceConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_container_root")]
    pub container_root: String,
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default = "default_collection_key")]
    pub collection_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExtensionConfig {
    #[serde(default = "default_extension_identifier")]
    pub identifier: String,
    #[serde(default = "default_reload_timeout_ms")]
    pub reload_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Local host only: minimum spacing between accepted reload requests.
    #[serde(default)]
    pub min_reload_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IntelligenceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_lookup_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PolicyConfig {
    #[serde(default = "default_min_risk_score")]
    pub min_risk_score: u8,
    #[serde(default = "default_min_times_reported")]
    pub min_times_reported: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Defaults
fn default_container_root() -> String {
    "containers".to_string()
}
fn default_group_id() -> String {
    "group.com.T.scamshield".to_string()
}
fn default_collection_key() -> String {
    "BlockedNumbers".to_string()
}
fn default_extension_identifier() -> String {
    "T.ScamShield.MyAppCallDirectory".to_string()
}
fn default_reload_timeout_ms() -> u64 {
    5000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    250
}
fn default_max_backoff_ms() -> u64 {
    4000
}
fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_lookup_timeout_ms() -> u64 {
    5000
}
fn default_user_agent() -> String {
    "ScamShield/1.0".to_string()
}
fn default_min_risk_score() -> u8 {
    70
}
fn default_min_times_reported() -> u32 {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            container_root: default_container_root(),
            group_id: default_group_id(),
            collection_key: default_collection_key(),
        }
    }
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            identifier: default_extension_identifier(),
            reload_timeout_ms: default_reload_timeout_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            min_reload_interval_ms: 0,
        }
    }
}

impl Default for IntelligenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_lookup_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_risk_score: default_min_risk_score(),
            min_times_reported: default_min_times_reported(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ExtensionConfig {
    pub fn reload_timeout(&self) -> Duration {
        Duration::from_millis(self.reload_timeout_ms)
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config TOML")?;
        Ok(config)
    }
}
