//! Segment list persistence with versioning.
//!
//! Uses JSON with a schema version field so detection results and hand edits
//! can be saved and reloaded between sessions.

use memefill_core::{MemeFillError, Result, Segment};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Versioned segment file wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFile {
    /// Schema version for migration.
    pub version: u32,
    /// Video the segments were detected in, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Segments in list order.
    pub segments: Vec<Segment>,
    /// Application version that wrote this file.
    pub app_version: String,
}

impl SegmentFile {
    /// Wrap a segment list.
    pub fn new(segments: impl Into<Vec<Segment>>) -> Self {
        Self {
            version: CURRENT_VERSION,
            source: None,
            segments: segments.into(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Record which video the segments belong to.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| {
            MemeFillError::Serialization(format!("Failed to serialize segments: {}", e))
        })
    }

    /// Deserialize from JSON bytes, applying migrations if needed.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| MemeFillError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
        let version = u32::try_from(version).map_err(|_| {
            MemeFillError::Serialization(format!("Segment file version {} is out of range", version))
        })?;

        if version > CURRENT_VERSION {
            return Err(MemeFillError::Serialization(format!(
                "Segment file version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let migrated = migrate(raw, version)?;

        serde_json::from_value(migrated)
            .map_err(|e| MemeFillError::Serialization(format!("Failed to parse segments: {}", e)))
    }

    /// Save to a file path.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Load from a file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

/// Apply sequential migrations from `from_version` to CURRENT_VERSION.
fn migrate(data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut data = data;
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 was a bare array of [start, end] pairs
                let pairs: Vec<(u64, u64)> = serde_json::from_value(data).map_err(|e| {
                    MemeFillError::Serialization(format!("Unrecognized segment file: {}", e))
                })?;
                let segments = pairs
                    .into_iter()
                    .map(|(start, end)| Segment::checked(start, end))
                    .collect::<Result<Vec<_>>>()?;
                data = serde_json::json!({
                    "version": 1,
                    "segments": segments,
                    "app_version": "0.0.0",
                });
                version = 1;
            }
            _ => {
                return Err(MemeFillError::Serialization(format!(
                    "No migration path from version {}",
                    version
                )));
            }
        }
    }

    Ok(data)
}
