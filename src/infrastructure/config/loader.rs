use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Snapshot key cannot be empty")]
    EmptySnapshotKey,

    #[error("Invalid cache ttl_secs: {0}. Must be at least 1")]
    InvalidCacheTtl(u64),

    #[error("Notification topic cannot be empty")]
    EmptyTopic,

    #[error("Invalid channel_capacity: {0}. Must be at least 1")]
    InvalidChannelCapacity(usize),

    #[error(
        "Invalid backoff: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid timeout for {0}: must be at least 1ms")]
    InvalidTimeout(&'static str),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .flagstate/config.yaml (project config)
    /// 3. .flagstate/local.yaml (project local overrides, optional)
    /// 4. Environment variables (FLAGSTATE_* prefix, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(Path::new(".flagstate/config.yaml"))
            .merge(Env::prefixed("FLAGSTATE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Environment variables still override values from the file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("FLAGSTATE_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(project_config: &Path) -> Figment {
        let local = project_config.with_file_name("local.yaml");
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(project_config))
            .merge(Yaml::file(local))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        if config.cache.snapshot_key.is_empty() {
            return Err(ConfigError::EmptySnapshotKey);
        }

        if config.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidCacheTtl(config.cache.ttl_secs));
        }

        if config.cache.max_capacity == 0 {
            return Err(ConfigError::ValidationFailed(
                "cache max_capacity must be at least 1".to_string(),
            ));
        }

        let notifications = &config.notifications;
        if notifications.topic.trim().is_empty() {
            return Err(ConfigError::EmptyTopic);
        }

        if notifications.channel_capacity == 0 {
            return Err(ConfigError::InvalidChannelCapacity(
                notifications.channel_capacity,
            ));
        }

        if notifications.initial_backoff_ms >= notifications.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                notifications.initial_backoff_ms,
                notifications.max_backoff_ms,
            ));
        }

        if notifications.dedup_capacity == 0 {
            return Err(ConfigError::ValidationFailed(
                "dedup_capacity must be at least 1".to_string(),
            ));
        }

        for (name, value) in [
            ("store", config.timeouts.store_ms),
            ("cache", config.timeouts.cache_ms),
            ("notify", config.timeouts.notify_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidTimeout(name));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
