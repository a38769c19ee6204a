//! Editing session: one video, its segment timeline and the overlay choices.
//!
//! Holds everything the editor would otherwise keep in widgets (selected
//! categories, zoom and fade values) and passes it explicitly into detection,
//! sampling and composition.

use memefill_analysis::{detect_black_segments_in_file, BlackDetectConfig};
use memefill_assets::AssetLibrary;
use memefill_core::{sort_segments, MemeFillError, Segment};
use memefill_effects::CompositionRequest;
use memefill_media::MediaProbe;
use memefill_timeline::{EditOutcome, EditTool, SegmentFile, TimelineModel, TimelineScale};
use rand::Rng;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::jobs::{JobEvent, JobHandle, JobKind};
use crate::settings::{Settings, FADE_RANGE_MS, ZOOM_RANGE};

/// Frame count assumed for the timeline when the container does not report one.
const FALLBACK_TOTAL_FRAMES: u64 = 1000;

/// File name of the preview render inside the temp directory.
pub const PREVIEW_FILE_NAME: &str = "preview_with_memes.mp4";

/// Reasons a session action cannot run.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please load a video first.")]
    NoVideo,

    #[error("No black frames detected.")]
    NoSegments,

    #[error("No memes available for the selected categories.")]
    NoAssets,

    #[error(transparent)]
    Core(#[from] MemeFillError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// State of one editing session.
#[derive(Debug)]
pub struct EditorSession {
    settings: Settings,
    library: AssetLibrary,
    selected: BTreeSet<String>,
    video: Option<MediaProbe>,
    timeline: TimelineModel,
    zoom_factor: f64,
    fade_ms: u64,
    status: String,
}

impl EditorSession {
    pub fn new(settings: Settings, library: AssetLibrary) -> Self {
        let timeline = match settings.history_limit {
            Some(limit) => TimelineModel::with_history_limit(limit),
            None => TimelineModel::new(),
        };
        Self {
            zoom_factor: settings.zoom_factor,
            fade_ms: settings.fade_ms,
            settings,
            library,
            selected: BTreeSet::new(),
            video: None,
            timeline,
            status: "Load a video to get started.".into(),
        }
    }

    /// Start a session, loading the asset library from `settings.asset_root`.
    pub fn open(settings: Settings) -> SessionResult<Self> {
        let library = AssetLibrary::load(&settings.asset_root)?;
        Ok(Self::new(settings, library))
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status = text.into();
        info!(status = %self.status, "Session status");
    }

    /// Last user-facing status message.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn library(&self) -> &AssetLibrary {
        &self.library
    }

    pub fn timeline(&self) -> &TimelineModel {
        &self.timeline
    }

    pub fn segments(&self) -> &[Segment] {
        self.timeline.segments()
    }

    pub fn video(&self) -> Option<&MediaProbe> {
        self.video.as_ref()
    }

    pub fn video_path(&self) -> SessionResult<&Path> {
        self.video
            .as_ref()
            .map(|v| Path::new(v.path.as_str()))
            .ok_or(SessionError::NoVideo)
    }

    // ── Video ───────────────────────────────────────────────────

    /// Probe and attach a video file.
    pub fn load_video(&mut self, path: &Path) -> SessionResult<&MediaProbe> {
        let probe = MediaProbe::probe(path)?;
        Ok(self.attach_video(probe))
    }

    /// Attach an already probed video.
    pub fn attach_video(&mut self, probe: MediaProbe) -> &MediaProbe {
        let name = Path::new(&probe.path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| probe.path.clone());
        self.set_status(format!("Loaded video: {name}"));
        self.video.insert(probe)
    }

    /// Frames shown on the timeline strip.
    pub fn total_frames(&self) -> u64 {
        self.video
            .as_ref()
            .and_then(MediaProbe::estimated_frames)
            .unwrap_or(FALLBACK_TOTAL_FRAMES)
            .max(1)
    }

    // ── Detection ───────────────────────────────────────────────

    /// Detect black segments in the loaded video and replace the timeline.
    pub fn detect(&mut self) -> SessionResult<usize> {
        let path = self.video_path()?.to_path_buf();
        self.set_status("Detecting black frames...");
        let config = BlackDetectConfig {
            threshold: self.settings.black_threshold,
        };
        let segments = detect_black_segments_in_file(&path, &config)?;
        Ok(self.apply_detection(segments))
    }

    /// Replace the timeline with detection results. Recorded in undo history.
    pub fn apply_detection(&mut self, segments: Vec<Segment>) -> usize {
        let count = segments.len();
        self.timeline.set_segments(segments);
        self.set_status(format!("Detected {count} black segments."));
        count
    }

    // ── Editing ─────────────────────────────────────────────────

    /// Apply the active tool at `frame`.
    pub fn click(&mut self, frame: u64) -> EditOutcome {
        let outcome = self.timeline.apply_tool(frame);
        match outcome {
            EditOutcome::MarkerAdded(seg) => self.set_status(format!("Marker added at {seg}")),
            EditOutcome::Split { original, .. } => {
                self.set_status(format!("Split {original} at frame {frame}"))
            }
            EditOutcome::NothingToSplit => {
                self.set_status(format!("No segment to split at frame {frame}"))
            }
        }
        outcome
    }

    /// Apply the active tool at pixel `x` of a timeline strip `width` pixels wide.
    pub fn click_at(&mut self, x: f32, width: f32) -> EditOutcome {
        let frame = TimelineScale::new(self.total_frames(), width).frame_at(x);
        self.click(frame)
    }

    pub fn set_tool(&mut self, tool: EditTool) {
        self.timeline.set_tool(tool);
        self.set_status(format!("Tool changed to: {tool}"));
    }

    /// Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.timeline.undo().map(<[Segment]>::len) {
            Some(count) => {
                self.set_status(format!("Undo performed. Segments: {count}"));
                true
            }
            None => {
                self.set_status("No more actions to undo.");
                false
            }
        }
    }

    /// Returns `false` when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.timeline.redo().map(<[Segment]>::len) {
            Some(count) => {
                self.set_status(format!("Redo performed. Segments: {count}"));
                true
            }
            None => {
                self.set_status("No more actions to redo.");
                false
            }
        }
    }

    /// Sort and merge overlapping segments. Recorded in undo history.
    pub fn normalize(&mut self) {
        self.timeline.normalize();
        let count = self.timeline.segments().len();
        self.set_status(format!("Normalized segments: {count}"));
    }

    /// Save the timeline as a segment file.
    pub fn save_segments(&self, path: &Path) -> SessionResult<()> {
        let mut file = SegmentFile::new(self.segments().to_vec());
        if let Some(video) = &self.video {
            file = file.with_source(video.path.clone());
        }
        file.save_to_file(path)?;
        Ok(())
    }

    /// Replace the timeline with a saved segment file. Recorded in undo history.
    pub fn load_segments(&mut self, path: &Path) -> SessionResult<usize> {
        let file = SegmentFile::load_from_file(path)?;
        let count = file.segments.len();
        self.timeline.set_segments(file.segments);
        self.set_status(format!("Loaded {count} segments from {}", path.display()));
        Ok(count)
    }

    // ── Overlay choices ─────────────────────────────────────────

    /// Tick a category. Returns `false` for names the library does not have.
    pub fn select_category(&mut self, name: &str) -> bool {
        if self.library.assets(name).is_none() {
            warn!(category = name, "Unknown asset category");
            return false;
        }
        self.selected.insert(name.to_string());
        true
    }

    pub fn deselect_category(&mut self, name: &str) {
        self.selected.remove(name);
    }

    pub fn selected_categories(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    pub fn zoom_factor(&self) -> f64 {
        self.zoom_factor
    }

    pub fn set_zoom_factor(&mut self, zoom: f64) -> SessionResult<()> {
        if !ZOOM_RANGE.contains(&zoom) {
            return Err(MemeFillError::InvalidParameter(format!(
                "Zoom factor {zoom} is outside 1-5"
            ))
            .into());
        }
        self.zoom_factor = zoom;
        Ok(())
    }

    pub fn fade_ms(&self) -> u64 {
        self.fade_ms
    }

    pub fn set_fade_ms(&mut self, fade_ms: u64) -> SessionResult<()> {
        if !FADE_RANGE_MS.contains(&fade_ms) {
            return Err(MemeFillError::InvalidParameter(format!(
                "Fade {fade_ms} ms is outside 0-2000"
            ))
            .into());
        }
        self.fade_ms = fade_ms;
        Ok(())
    }

    // ── Composition ─────────────────────────────────────────────

    /// Build the composition request for the current state.
    ///
    /// Samples one asset per segment (fewer if the pool is smaller) from the
    /// selected categories. Segments are sorted by start frame.
    pub fn plan_composition<R: Rng + ?Sized>(&self, rng: &mut R) -> SessionResult<CompositionRequest> {
        self.video_path()?;
        let segments = self.segments();
        if segments.is_empty() {
            return Err(SessionError::NoSegments);
        }
        let selected: Vec<&str> = self.selected_categories().collect();
        let assets = self.library.sample(&selected, segments.len(), rng);
        if assets.is_empty() {
            return Err(SessionError::NoAssets);
        }
        Ok(CompositionRequest::new(sort_segments(segments), assets)
            .with_zoom(self.zoom_factor)
            .with_fade_millis(self.fade_ms))
    }

    /// Where previews are rendered.
    pub fn preview_path() -> PathBuf {
        std::env::temp_dir().join(PREVIEW_FILE_NAME)
    }

    /// Start rendering a preview into the temp directory.
    pub fn start_preview<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SessionResult<JobHandle> {
        let job = self.start_render(Self::preview_path(), rng)?;
        self.set_status("Rendering preview...".to_string());
        Ok(job)
    }

    /// Start exporting to `output`, appending `.mp4` if it has another extension.
    pub fn start_export<R: Rng + ?Sized>(&mut self, output: &Path, rng: &mut R) -> SessionResult<JobHandle> {
        let output = mp4_output_path(output);
        let job = self.start_render(output.clone(), rng)?;
        self.set_status(format!("Exporting to {}...", output.display()));
        Ok(job)
    }

    fn start_render<R: Rng + ?Sized>(&self, output: PathBuf, rng: &mut R) -> SessionResult<JobHandle> {
        let request = self.plan_composition(rng)?;
        let input = self.video_path()?.to_path_buf();
        Ok(JobHandle::compose_file(
            input,
            output,
            request,
            self.settings.encode_settings(),
        ))
    }

    /// Record the outcome of a finished background job.
    pub fn finish_job(&mut self, event: &JobEvent) {
        match event {
            JobEvent::Progress { .. } => {}
            JobEvent::Detected(segments) => {
                self.apply_detection(segments.clone());
            }
            JobEvent::Composed { output, .. } if *output == Self::preview_path() => {
                self.set_status(format!("Preview rendered: {}", output.display()));
            }
            JobEvent::Composed { output, .. } => {
                self.set_status(format!("Video exported successfully: {}", output.display()));
            }
            JobEvent::Failed {
                kind, cancelled: true, ..
            } => self.set_status(format!("{} cancelled.", job_label(*kind))),
            JobEvent::Failed { kind, error, .. } => {
                self.set_status(format!("{} failed: {error}", job_label(*kind)));
            }
        }
    }
}

fn job_label(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Detect => "Detection",
        JobKind::Compose => "Export",
    }
}

/// Force an `.mp4` file name by appending the extension when missing.
pub fn mp4_output_path(path: &Path) -> PathBuf {
    let is_mp4 = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp4"));
    if is_mp4 {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".mp4");
        PathBuf::from(name)
    }
}
