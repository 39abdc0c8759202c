use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for flagstate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Snapshot cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Change notification configuration
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Deadlines for calls to external dependencies
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".flagstate/flags.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// `SQLite` connection URL for the configured path
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// Snapshot cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Well-known key holding the all-flags snapshot
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,

    /// Snapshot time-to-live in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cache entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,

    /// Invalidate the snapshot on create as well as update/delete
    #[serde(default)]
    pub invalidate_on_create: bool,
}

fn default_snapshot_key() -> String {
    "feature_flags".to_string()
}

const fn default_ttl_secs() -> u64 {
    60
}

const fn default_max_capacity() -> u64 {
    64
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_key: default_snapshot_key(),
            ttl_secs: default_ttl_secs(),
            max_capacity: default_max_capacity(),
            invalidate_on_create: false,
        }
    }
}

impl CacheConfig {
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// How write operations hand notifications to the publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Publish inline; a failed publish fails the write
    Strict,
    /// Queue for a background dispatcher that retries with backoff
    #[default]
    Deferred,
}

/// When the consumer acknowledges a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// Acknowledge on receipt, before the handler runs
    Auto,
    /// Acknowledge once the handler succeeds; redeliver on failure
    #[default]
    AfterHandle,
}

/// Change notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationConfig {
    /// Topic that flag changes are published to
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Broker channel capacity per topic
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Publish-side delivery mode
    #[serde(default)]
    pub delivery: DeliveryMode,

    /// Initial retry backoff for deferred delivery
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum retry backoff for deferred delivery
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Total time budget for retrying one notification
    #[serde(default = "default_max_elapsed_ms")]
    pub max_elapsed_ms: u64,

    /// Consumer acknowledgement mode
    #[serde(default)]
    pub ack_mode: AckMode,

    /// Redeliveries allowed before a failing message is dropped
    #[serde(default = "default_max_redeliveries")]
    pub max_redeliveries: u32,

    /// Number of processed event ids remembered for deduplication
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: u64,

    /// How long processed event ids are remembered, in seconds
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
}

fn default_topic() -> String {
    "flag-updates".to_string()
}

const fn default_channel_capacity() -> usize {
    1024
}

const fn default_initial_backoff_ms() -> u64 {
    100
}

const fn default_max_backoff_ms() -> u64 {
    5_000
}

const fn default_max_elapsed_ms() -> u64 {
    60_000
}

const fn default_max_redeliveries() -> u32 {
    3
}

const fn default_dedup_capacity() -> u64 {
    10_000
}

const fn default_dedup_ttl_secs() -> u64 {
    3600
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            channel_capacity: default_channel_capacity(),
            delivery: DeliveryMode::default(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_elapsed_ms: default_max_elapsed_ms(),
            ack_mode: AckMode::default(),
            max_redeliveries: default_max_redeliveries(),
            dedup_capacity: default_dedup_capacity(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
        }
    }
}

/// Deadlines for calls to external dependencies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    #[serde(default = "default_store_ms")]
    pub store_ms: u64,

    #[serde(default = "default_cache_ms")]
    pub cache_ms: u64,

    #[serde(default = "default_notify_ms")]
    pub notify_ms: u64,
}

const fn default_store_ms() -> u64 {
    5_000
}

const fn default_cache_ms() -> u64 {
    250
}

const fn default_notify_ms() -> u64 {
    2_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            store_ms: default_store_ms(),
            cache_ms: default_cache_ms(),
            notify_ms: default_notify_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
