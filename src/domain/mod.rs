//! Domain layer for the flagstate service
//!
//! This module contains the flag models, the port traits that infrastructure
//! adapters implement, and the error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{
    CacheError, FlagError, FlagResult, NotificationError, SnapshotError, StoreError,
};
