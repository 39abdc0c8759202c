//! Domain models for feature flags, change notifications and configuration.

pub mod config;
pub mod feature_flag;
pub mod flag_change;

pub use config::{
    AckMode, CacheConfig, Config, DatabaseConfig, DeliveryMode, LoggingConfig,
    NotificationConfig, TimeoutConfig,
};
pub use feature_flag::{FeatureFlag, FlagId, NewFeatureFlag, MAX_FLAG_NAME_LEN};
pub use flag_change::{FlagAction, FlagChange};
