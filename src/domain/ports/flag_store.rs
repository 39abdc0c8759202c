use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::domain::models::{FeatureFlag, FlagId};

/// Durable source of truth for flag records.
///
/// Implementations provide durability and per-call atomicity only. Nothing
/// spans more than one call.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Insert a flag, returning it with the store-assigned id and `created_at`.
    async fn insert(&self, name: &str, enabled: bool) -> Result<FeatureFlag, StoreError>;

    /// All flags, ordered by id.
    async fn select_all(&self) -> Result<Vec<FeatureFlag>, StoreError>;

    /// Set name and enabled on the flag with `id`.
    ///
    /// # Returns
    /// * `Ok(rows_affected)` - 0 when no flag has that id
    async fn update(&self, id: FlagId, name: &str, enabled: bool) -> Result<u64, StoreError>;

    /// Hard-delete the flag with `id`, returning the number of rows removed.
    async fn delete(&self, id: FlagId) -> Result<u64, StoreError>;
}
