//! Infrastructure adapters for external systems.

pub mod cache;
pub mod messaging;
pub mod sqlite;
