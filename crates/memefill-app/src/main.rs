//! MemeFill - fill black gaps in a video with zoomed, fading memes
//!
//! Entry point for the `memefill` command line tool.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use memefill_app::{EditorSession, JobEvent, JobHandle, JobKind, Settings};
use memefill_analysis::BlackDetectConfig;
use memefill_timeline::{EditOutcome, EditTool, SegmentFile};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "memefill", version)]
#[command(about = "Detect black segments in a video and fill them with memes", long_about = None)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Asset folder with one subfolder per category
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect black segments and print or save them
    Detect {
        /// Input video
        video: PathBuf,

        /// Mean brightness (0-255) below which a frame is black
        #[arg(long)]
        threshold: Option<f64>,

        /// Write the segments to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List asset categories
    Categories,
    /// Render the filled video to a file (`.mp4` is appended if missing)
    Export {
        /// Input video
        video: PathBuf,

        /// Output file
        output: PathBuf,

        #[command(flatten)]
        overlay: OverlayArgs,
    },
    /// Render the filled video into the temp directory
    Preview {
        /// Input video
        video: PathBuf,

        #[command(flatten)]
        overlay: OverlayArgs,
    },
    /// Edit a segment list with commands read from stdin
    Edit {
        /// Video the segments belong to, used for pixel clicks
        #[arg(long)]
        video: Option<PathBuf>,

        /// Segment file to start from and save to
        segments: PathBuf,
    },
}

#[derive(Args, Debug)]
struct OverlayArgs {
    /// Segment file to use instead of running detection
    #[arg(long)]
    segments: Option<PathBuf>,

    /// Category to draw memes from (repeatable; default: all)
    #[arg(short, long = "category")]
    categories: Vec<String>,

    /// Overlay zoom factor (1-5)
    #[arg(long)]
    zoom: Option<f64>,

    /// Fade-out length in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=2000))]
    fade_ms: Option<u64>,

    /// Seed for meme sampling
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings_path = cli.settings.clone().unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    if let Some(assets) = &cli.assets {
        settings.asset_root = assets.clone();
    }

    memefill_media::init();

    match cli.command {
        Commands::Detect {
            video,
            threshold,
            output,
        } => detect(settings, &video, threshold, output.as_deref()),
        Commands::Categories => categories(settings),
        Commands::Export {
            video,
            output,
            overlay,
        } => export(settings, &video, &output, &overlay),
        Commands::Preview { video, overlay } => preview(settings, &video, &overlay),
        Commands::Edit { video, segments } => edit(settings, video.as_deref(), &segments),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn detect(
    mut settings: Settings,
    video: &Path,
    threshold: Option<f64>,
    output: Option<&Path>,
) -> Result<()> {
    if let Some(threshold) = threshold {
        settings.black_threshold = threshold;
    }
    settings.validate()?;

    let config = BlackDetectConfig {
        threshold: settings.black_threshold,
    };
    let job = JobHandle::detect_file(video.to_path_buf(), config);
    let segments = match job.wait_with(print_progress("Scanning")) {
        JobEvent::Detected(segments) => segments,
        JobEvent::Failed { error, .. } => bail!("Detection failed: {error}"),
        other => bail!("Unexpected job result: {other:?}"),
    };
    eprintln!();

    for segment in &segments {
        println!("{segment}");
    }
    info!(count = segments.len(), "Detected black segments");

    if let Some(output) = output {
        SegmentFile::new(segments)
            .with_source(video.to_string_lossy())
            .save_to_file(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Saved segments to {}", output.display());
    }
    Ok(())
}

fn categories(settings: Settings) -> Result<()> {
    let session = EditorSession::open(settings)?;
    let library = session.library();
    if library.is_empty() {
        println!(
            "No categories in {} (add one folder per category)",
            session.settings().asset_root.display()
        );
    }
    for name in library.categories() {
        let count = library.assets(name).map_or(0, <[PathBuf]>::len);
        println!("{name}\t{count}");
    }
    Ok(())
}

/// Load the video, segments and overlay choices shared by export and preview.
fn prepare_session(settings: Settings, video: &Path, overlay: &OverlayArgs) -> Result<EditorSession> {
    let mut session = EditorSession::open(settings)?;
    session
        .load_video(video)
        .with_context(|| format!("Could not open video {}", video.display()))?;

    match &overlay.segments {
        Some(path) => {
            session.load_segments(path)?;
        }
        None => {
            session.detect()?;
        }
    }
    println!("{}", session.status());

    if overlay.categories.is_empty() {
        let all: Vec<String> = session.library().categories().map(str::to_string).collect();
        for name in &all {
            session.select_category(name);
        }
    } else {
        for name in &overlay.categories {
            if !session.select_category(name) {
                eprintln!("Unknown category: {name}");
            }
        }
    }

    if let Some(zoom) = overlay.zoom {
        session.set_zoom_factor(zoom)?;
    }
    if let Some(fade_ms) = overlay.fade_ms {
        session.set_fade_ms(fade_ms)?;
    }
    Ok(session)
}

fn export(settings: Settings, video: &Path, output: &Path, overlay: &OverlayArgs) -> Result<()> {
    let mut session = prepare_session(settings, video, overlay)?;
    let job = match overlay.seed {
        Some(seed) => session.start_export(output, &mut StdRng::seed_from_u64(seed))?,
        None => session.start_export(output, &mut rand::thread_rng())?,
    };
    run_to_completion(&mut session, job, "Exporting")
}

fn preview(settings: Settings, video: &Path, overlay: &OverlayArgs) -> Result<()> {
    let mut session = prepare_session(settings, video, overlay)?;
    let job = match overlay.seed {
        Some(seed) => session.start_preview(&mut StdRng::seed_from_u64(seed))?,
        None => session.start_preview(&mut rand::thread_rng())?,
    };
    run_to_completion(&mut session, job, "Rendering")
}

/// Wait for a render job, printing progress, and report its outcome.
fn run_to_completion(session: &mut EditorSession, job: JobHandle, label: &'static str) -> Result<()> {
    let event = job.wait_with(print_progress(label));
    eprintln!();
    session.finish_job(&event);
    match event {
        JobEvent::Composed { report, .. } => {
            println!(
                "{} ({} frames, {} filled)",
                session.status(),
                report.frames_written,
                report.frames_overlaid
            );
            Ok(())
        }
        _ => bail!("{}", session.status()),
    }
}

const EDIT_HELP: &str = "\
commands:
  tool [marker|split|selection]   show or change the active tool
  click <frame>                   apply the tool at a frame
  click-at <x> <width>            apply the tool at a pixel of a timeline strip
  undo | redo                     step through history
  normalize                       sort and merge overlapping segments
  list                            print the segments
  save                            write the segment file
  category <name>                 toggle a meme category
  preview | export <path>         render in the background
  cancel                          stop the running render
  wait                            block until the running render ends
  help | quit";

fn edit(settings: Settings, video: Option<&Path>, segments_path: &Path) -> Result<()> {
    let mut session = EditorSession::open(settings)?;
    if let Some(video) = video {
        session
            .load_video(video)
            .with_context(|| format!("Could not open video {}", video.display()))?;
    }
    if segments_path.exists() {
        session.load_segments(segments_path)?;
    }
    println!("{}", session.status());

    let mut job: Option<JobHandle> = None;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        drain_job(&mut session, &mut job);

        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        match (command, args.as_slice()) {
            ("quit" | "exit", _) => break,
            ("help", _) => {
                println!("{EDIT_HELP}");
                continue;
            }
            ("tool", []) => println!("{}", session.timeline().active_tool()),
            ("tool", [name @ ..]) => match name.join(" ").parse::<EditTool>() {
                Ok(tool) => session.set_tool(tool),
                Err(e) => println!("{e}"),
            },
            ("click", [frame]) => match frame.parse::<u64>() {
                Ok(frame) => report_edit(session.click(frame)),
                Err(_) => println!("Not a frame number: {frame}"),
            },
            ("click-at", [x, width]) => match (x.parse::<f32>(), width.parse::<f32>()) {
                (Ok(x), Ok(width)) => report_edit(session.click_at(x, width)),
                _ => println!("Usage: click-at <x> <width>"),
            },
            ("undo", []) => {
                session.undo();
            }
            ("redo", []) => {
                session.redo();
            }
            ("normalize", []) => session.normalize(),
            ("list", []) => {
                for segment in session.segments() {
                    println!("{segment}");
                }
                continue;
            }
            ("save", []) => {
                session.save_segments(segments_path)?;
                println!("Saved {} segments", session.segments().len());
                continue;
            }
            ("category", [name]) => {
                if session.selected_categories().any(|c| c == *name) {
                    session.deselect_category(name);
                    println!("Deselected {name}");
                } else if session.select_category(name) {
                    println!("Selected {name}");
                } else {
                    println!("Unknown category: {name}");
                }
                continue;
            }
            ("preview" | "export", _) if job.is_some() => {
                println!("A render is already running (try 'cancel' or 'wait')");
                continue;
            }
            ("preview", []) => match session.start_preview(&mut rand::thread_rng()) {
                Ok(started) => job = Some(started),
                Err(e) => println!("{e}"),
            },
            ("export", [path]) => match session.start_export(Path::new(path), &mut rand::thread_rng()) {
                Ok(started) => job = Some(started),
                Err(e) => println!("{e}"),
            },
            ("cancel", []) => match &job {
                Some(running) => {
                    running.cancel();
                    println!("Cancelling...");
                    continue;
                }
                None => {
                    println!("Nothing is running");
                    continue;
                }
            },
            ("wait", []) => match job.take() {
                Some(running) => {
                    let event = running.wait_with(print_progress("Rendering"));
                    eprintln!();
                    session.finish_job(&event);
                }
                None => {
                    println!("Nothing is running");
                    continue;
                }
            },
            _ => {
                println!("Unknown command: {line} (try 'help')");
                continue;
            }
        }
        println!("{}", session.status());
        stdout.flush()?;
    }

    if let Some(running) = job.take() {
        running.cancel();
        session.finish_job(&running.wait());
        println!("{}", session.status());
    }
    Ok(())
}

/// Report progress of a background render and pick up its result once done.
fn drain_job(session: &mut EditorSession, job: &mut Option<JobHandle>) {
    let Some(running) = job.as_ref() else {
        return;
    };
    let label = match running.kind() {
        JobKind::Detect => "Scanning",
        JobKind::Compose => "Rendering",
    };
    for event in running.poll() {
        if event.is_terminal() {
            eprintln!();
            session.finish_job(&event);
            println!("{}", session.status());
            *job = None;
            return;
        }
        if let JobEvent::Progress { frames, total, .. } = event {
            print_progress(label)(frames, total);
        }
    }
}

fn report_edit(outcome: EditOutcome) {
    if let EditOutcome::Split { left, right, .. } = outcome {
        println!("{left} {right}");
    }
}

fn print_progress(label: &'static str) -> impl FnMut(u64, Option<u64>) {
    move |frames, total| {
        match total {
            Some(total) if total > 0 => {
                let pct = (frames as f64 / total as f64 * 100.0).min(100.0);
                eprint!("\r{label}: {frames}/{total} frames ({pct:.0}%)");
            }
            _ => eprint!("\r{label}: {frames} frames"),
        }
        let _ = io::stderr().flush();
    }
}
