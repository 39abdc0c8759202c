//! Serialization of the all-flags cache snapshot.
//!
//! The snapshot is a JSON envelope `{"format": N, "flags": [...]}`. A payload
//! with another format number is rejected as incompatible rather than
//! misread.

use serde::{Deserialize, Serialize};

use crate::domain::errors::SnapshotError;
use crate::domain::models::FeatureFlag;

/// Format number written into every snapshot.
pub const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Serialize)]
struct SnapshotOut<'a> {
    format: u32,
    flags: &'a [FeatureFlag],
}

#[derive(Deserialize)]
struct SnapshotIn {
    format: u32,
    flags: serde_json::Value,
}

pub fn encode_snapshot(flags: &[FeatureFlag]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&SnapshotOut {
        format: SNAPSHOT_FORMAT,
        flags,
    })
}

pub fn decode_snapshot(bytes: &[u8]) -> Result<Vec<FeatureFlag>, SnapshotError> {
    let envelope: SnapshotIn = serde_json::from_slice(bytes)?;
    if envelope.format != SNAPSHOT_FORMAT {
        return Err(SnapshotError::IncompatibleFormat {
            found: envelope.format,
            expected: SNAPSHOT_FORMAT,
        });
    }
    Ok(serde_json::from_value(envelope.flags)?)
}
