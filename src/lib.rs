//! flagstate - cached feature flag store with change notifications
//!
//! Feature flags live in a durable SQLite store. Reads go through a
//! cache-aside snapshot of the whole flag set that expires after a TTL and is
//! invalidated on update and delete. Every write publishes a change event to a
//! topic that in-process listeners consume with at-least-once semantics.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, ports and errors
//! - **Adapters** (`adapters`): SQLite store, moka cache, in-memory broker
//! - **Service Layer** (`services`): the flag repository, notification
//!   dispatch and the change listener
//! - **Application Layer** (`application`): runtime wiring and shutdown
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use flagstate::application::FlagRuntime;
//! use flagstate::domain::models::{Config, NewFeatureFlag};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = FlagRuntime::start(&Config::default()).await?;
//!     runtime.repository().create(NewFeatureFlag::new("beta", true)).await?;
//!     let flags = runtime.repository().get_all().await?;
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{FlagRuntime, ShutdownReport};
pub use domain::errors::{FlagError, FlagResult};
pub use domain::models::{
    AckMode, Config, DeliveryMode, FeatureFlag, FlagAction, FlagChange, FlagId, NewFeatureFlag,
};
pub use domain::ports::{ChangePublisher, ChangeSubscription, FlagStore, SnapshotCache};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{FlagRepository, NotificationDispatcher, RepositorySettings};
