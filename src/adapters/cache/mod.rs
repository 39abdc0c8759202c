//! Ephemeral caching for the all-flags snapshot.
//!
//! Uses `moka` for TTL-based concurrent caching. The cache never holds
//! authority: the repository falls back to the store on any miss or error.

pub mod moka_snapshot_cache;

pub use moka_snapshot_cache::MokaSnapshotCache;
