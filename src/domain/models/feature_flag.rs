use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{FlagError, FlagResult};

/// Store-assigned identifier of a feature flag.
pub type FlagId = i64;

/// Longest flag name accepted by the repository.
pub const MAX_FLAG_NAME_LEN: usize = 255;

/// A named boolean toggle as persisted in the durable store.
///
/// `id` and `created_at` are assigned by the store on insert and never change
/// afterwards. Only `name` and `enabled` are mutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub id: FlagId,
    pub name: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl FeatureFlag {
    /// Check that the mutable fields form a valid update.
    pub fn validate_for_update(&self) -> FlagResult<()> {
        if self.id <= 0 {
            return Err(FlagError::Validation(format!(
                "flag id must be positive, got {}",
                self.id
            )));
        }
        validate_name(&self.name)
    }
}

/// Input for creating a flag.
///
/// There is no way to carry an id or creation timestamp through this type:
/// both are always assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeatureFlag {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

impl NewFeatureFlag {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
        }
    }

    pub fn validate(&self) -> FlagResult<()> {
        validate_name(&self.name)
    }
}

impl From<FeatureFlag> for NewFeatureFlag {
    fn from(flag: FeatureFlag) -> Self {
        Self {
            name: flag.name,
            enabled: flag.enabled,
        }
    }
}

fn validate_name(name: &str) -> FlagResult<()> {
    if name.trim().is_empty() {
        return Err(FlagError::Validation(
            "flag name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_FLAG_NAME_LEN {
        return Err(FlagError::Validation(format!(
            "flag name exceeds {MAX_FLAG_NAME_LEN} characters"
        )));
    }
    Ok(())
}
