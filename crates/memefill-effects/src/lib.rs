//! MemeFill Effects - CPU overlay pipeline
//!
//! Turns an asset into a frame-sized overlay (zoom and center-crop), fades
//! it out at the tail of a segment and alpha-blends it into the video.

pub mod blend;
pub mod compose;
pub mod fade;
pub mod overlay;
pub mod zoom;

pub use blend::blend_into;
pub use compose::{
    compose, compose_file, CompositionReport, CompositionRequest, EncodeSettings,
};
pub use fade::FadeSchedule;
pub use overlay::{load_overlay, prepare_overlay};
pub use zoom::zoom_crop;

/// Default zoom multiplier for overlays.
pub const DEFAULT_ZOOM_FACTOR: f64 = 2.0;

/// Largest zoom multiplier a composition accepts.
pub const MAX_ZOOM_FACTOR: f64 = 5.0;

/// Pixel budget for the intermediate zoomed overlay (1 GiB of RGBA8).
pub const MAX_ZOOMED_PIXELS: u64 = 1 << 28;

/// Default fade-out length in milliseconds.
pub const DEFAULT_FADE_MS: u64 = 500;
