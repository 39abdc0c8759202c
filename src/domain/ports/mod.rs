//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - FlagStore: Durable storage of flag records
//! - SnapshotCache: Ephemeral TTL cache for the all-flags snapshot
//! - ChangePublisher / ChangeSubscription: Change notification channel
//!
//! These traits keep the repository independent of specific backends.

pub mod change_publisher;
pub mod change_subscription;
pub mod flag_store;
pub mod snapshot_cache;

pub use change_publisher::ChangePublisher;
pub use change_subscription::{ChangeSubscription, Delivery};
pub use flag_store::FlagStore;
pub use snapshot_cache::SnapshotCache;
