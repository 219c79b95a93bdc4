use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    pub max_concurrent_jobs: usize,
    pub poll_interval_ms: u64,
    pub tick_interval_ms: u64,
    pub footer_height: u16,
    pub request_timeout_secs: u64,
    pub status_margin: u16,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 20,
            poll_interval_ms: 2_000,
            tick_interval_ms: 1_000,
            footer_height: 2,
            request_timeout_secs: 60,
            status_margin: 10,
        }
    }
}

impl CleanerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn load_config(path: Option<&std::path::Path>) -> Result<CleanerConfig> {
    let config = if let Some(config_path) = path {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

            toml::from_str::<CleanerConfig>(&contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", config_path);
            CleanerConfig::default()
        }
    } else {
        tracing::debug!("No config path provided, using defaults");
        CleanerConfig::default()
    };

    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &CleanerConfig) -> Result<()> {
    if config.max_concurrent_jobs == 0 {
        anyhow::bail!("max_concurrent_jobs must be at least 1");
    }

    if config.poll_interval_ms == 0 {
        anyhow::bail!("poll_interval_ms must be at least 1");
    }

    if config.tick_interval_ms == 0 {
        anyhow::bail!("tick_interval_ms must be at least 1");
    }

    if config.footer_height == 0 {
        anyhow::bail!("footer_height must be at least 1");
    }

    Ok(())
}
