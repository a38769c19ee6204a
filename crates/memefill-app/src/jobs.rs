//! Background detection and composition jobs.
//!
//! Each job runs on its own thread and reports back over a channel so a
//! front end can keep polling for input while a video is processed.

use crossbeam_channel::{unbounded, Receiver, Sender};
use memefill_analysis::{detect_black_segments_with, BlackDetectConfig};
use memefill_core::{MemeFillError, Result, Segment};
use memefill_effects::{compose_file, CompositionReport, CompositionRequest, EncodeSettings};
use memefill_media::{ExportCancel, FrameSource, VideoDecoder};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// What a job is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Detect,
    Compose,
}

/// Messages sent from a job thread.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress {
        kind: JobKind,
        frames: u64,
        total: Option<u64>,
    },
    Detected(Vec<Segment>),
    Composed {
        output: PathBuf,
        report: CompositionReport,
    },
    Failed {
        kind: JobKind,
        error: String,
        cancelled: bool,
    },
}

impl JobEvent {
    /// Whether this is the last event a job sends.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Handle to a running job.
pub struct JobHandle {
    kind: JobKind,
    events: Receiver<JobEvent>,
    cancel: ExportCancel,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    fn spawn<F>(kind: JobKind, work: F) -> Self
    where
        F: FnOnce(&ExportCancel, &Sender<JobEvent>) -> Result<JobEvent> + Send + 'static,
    {
        let (tx, rx) = unbounded();
        let cancel = ExportCancel::new();
        let worker_cancel = cancel.clone();

        let thread = thread::spawn(move || {
            let event = match work(&worker_cancel, &tx) {
                Ok(event) => event,
                Err(e) => {
                    let cancelled = matches!(e, MemeFillError::Cancelled);
                    if !cancelled {
                        error!(?kind, error = %e, "Background job failed");
                    }
                    JobEvent::Failed {
                        kind,
                        error: e.to_string(),
                        cancelled,
                    }
                }
            };
            // Receiver may already be gone
            let _ = tx.send(event);
        });
        debug!(?kind, "Background job started");

        Self {
            kind,
            events: rx,
            cancel,
            thread: Some(thread),
        }
    }

    /// Detect black segments of a video file on a worker thread.
    pub fn detect_file(path: PathBuf, config: BlackDetectConfig) -> Self {
        Self::detect(move || VideoDecoder::open(&path), config)
    }

    /// Detect black segments on a worker thread.
    ///
    /// `open` runs on the worker too, so a slow probe does not block the caller.
    pub fn detect<S, O>(open: O, config: BlackDetectConfig) -> Self
    where
        S: FrameSource + 'static,
        O: FnOnce() -> Result<S> + Send + 'static,
    {
        Self::spawn(JobKind::Detect, move |cancel, tx| {
            let mut source = open()?;
            let segments = detect_black_segments_with(&mut source, &config, cancel, |frames, total| {
                let _ = tx.send(JobEvent::Progress {
                    kind: JobKind::Detect,
                    frames,
                    total,
                });
            })?;
            Ok(JobEvent::Detected(segments))
        })
    }

    /// Compose a video file into `output` on a worker thread.
    ///
    /// A cancelled or failed job leaves no file at `output`.
    pub fn compose_file(
        input: PathBuf,
        output: PathBuf,
        request: CompositionRequest,
        settings: EncodeSettings,
    ) -> Self {
        Self::spawn(JobKind::Compose, move |cancel, tx| {
            let report = compose_file(&input, &output, &request, settings, cancel, |frames, total| {
                let _ = tx.send(JobEvent::Progress {
                    kind: JobKind::Compose,
                    frames,
                    total,
                });
            })?;
            Ok(JobEvent::Composed { output, report })
        })
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Drain events that are ready without blocking.
    pub fn poll(&self) -> Vec<JobEvent> {
        self.events.try_iter().collect()
    }

    /// Ask the job to stop at the next frame.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the job ends and return its terminal event.
    ///
    /// Progress events still queued are passed to `on_progress` first.
    pub fn wait_with<F>(mut self, mut on_progress: F) -> JobEvent
    where
        F: FnMut(u64, Option<u64>),
    {
        let mut terminal = None;
        for event in self.events.iter() {
            match event {
                JobEvent::Progress { frames, total, .. } => on_progress(frames, total),
                other => {
                    terminal = Some(other);
                    break;
                }
            }
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        terminal.unwrap_or_else(|| JobEvent::Failed {
            kind: self.kind,
            error: "Job thread exited without a result".into(),
            cancelled: false,
        })
    }

    pub fn wait(self) -> JobEvent {
        self.wait_with(|_, _| {})
    }
}
