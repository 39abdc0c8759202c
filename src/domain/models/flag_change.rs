use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::FlagId;

/// What happened to a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum FlagAction {
    Created,
    Updated,
    Deleted,
}

impl FlagAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for FlagAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown flag action: {other}")),
        }
    }
}

/// A transient announcement that a flag changed.
///
/// `event_id` stays the same across redeliveries of one announcement, so
/// consumers can use it to discard duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagChange {
    pub event_id: Uuid,
    pub flag_id: FlagId,
    pub action: FlagAction,
    pub occurred_at: DateTime<Utc>,
}

impl FlagChange {
    pub fn new(flag_id: FlagId, action: FlagAction) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            flag_id,
            action,
            occurred_at: Utc::now(),
        }
    }

    pub fn created(flag_id: FlagId) -> Self {
        Self::new(flag_id, FlagAction::Created)
    }

    pub fn updated(flag_id: FlagId) -> Self {
        Self::new(flag_id, FlagAction::Updated)
    }

    pub fn deleted(flag_id: FlagId) -> Self {
        Self::new(flag_id, FlagAction::Deleted)
    }
}

impl fmt::Display for FlagChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Feature flag {} {}", self.flag_id, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_wire_text() {
        let change = FlagChange::created(7);
        assert_eq!(change.to_string(), "Feature flag 7 created");
    }

    #[test]
    fn test_action_round_trips_through_str() {
        for action in [FlagAction::Created, FlagAction::Updated, FlagAction::Deleted] {
            assert_eq!(action.as_str().parse::<FlagAction>().unwrap(), action);
        }
        assert!("archived".parse::<FlagAction>().is_err());
    }

    #[test]
    fn test_action_serializes_lowercase() {
        let json = serde_json::to_string(&FlagChange::deleted(3)).unwrap();
        assert!(json.contains(r#""action":"deleted""#));
    }

    #[test]
    fn test_each_change_gets_fresh_event_id() {
        assert_ne!(FlagChange::updated(1).event_id, FlagChange::updated(1).event_id);
    }
}
