//! Persisted user settings.

use memefill_core::{MemeFillError, Result, DEFAULT_BLACK_THRESHOLD};
use memefill_effects::{EncodeSettings, DEFAULT_FADE_MS};
use memefill_media::VideoCodec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Zoom slider range.
pub const ZOOM_RANGE: std::ops::RangeInclusive<f64> = 1.0..=memefill_effects::MAX_ZOOM_FACTOR;

/// Fade slider range in milliseconds.
pub const FADE_RANGE_MS: std::ops::RangeInclusive<u64> = 0..=2000;

/// Settings stored as JSON under the user config directory.
///
/// Missing fields take their defaults, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder-per-category overlay root.
    pub asset_root: PathBuf,
    /// Mean luma below which a frame counts as black.
    pub black_threshold: f64,
    pub zoom_factor: f64,
    pub fade_ms: u64,
    /// Maximum undo depth; `None` keeps every step.
    pub history_limit: Option<usize>,
    pub codec: VideoCodec,
    pub crf: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("memes"),
            black_threshold: DEFAULT_BLACK_THRESHOLD,
            zoom_factor: 2.0,
            fade_ms: DEFAULT_FADE_MS,
            history_limit: None,
            codec: VideoCodec::H264,
            crf: Some(18),
        }
    }
}

impl Settings {
    /// Default settings file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("memefill")
            .join("settings.json")
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&json).map_err(|e| {
            MemeFillError::Serialization(format!("Failed to parse settings: {e}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            MemeFillError::Serialization(format!("Failed to serialize settings: {e}"))
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check values against the ranges the editor exposes.
    pub fn validate(&self) -> Result<()> {
        if !ZOOM_RANGE.contains(&self.zoom_factor) {
            return Err(MemeFillError::InvalidParameter(format!(
                "zoom_factor {} is outside 1-5",
                self.zoom_factor
            )));
        }
        if !FADE_RANGE_MS.contains(&self.fade_ms) {
            return Err(MemeFillError::InvalidParameter(format!(
                "fade_ms {} is outside 0-2000",
                self.fade_ms
            )));
        }
        if !(0.0..=255.0).contains(&self.black_threshold) {
            return Err(MemeFillError::InvalidParameter(format!(
                "black_threshold {} is outside 0-255",
                self.black_threshold
            )));
        }
        Ok(())
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            codec: self.codec,
            crf: self.crf,
        }
    }
}
