//! End-to-end tests: detection, asset sampling and composition together.
//!
//! Exercises memefill-analysis, memefill-assets and memefill-effects over the
//! frame source/sink seam from memefill-media.

use image::{Rgba, RgbaImage};
use memefill_analysis::{detect_black_segments, BlackDetectConfig};
use memefill_app::EditorSession;
use memefill_app::Settings;
use memefill_assets::AssetLibrary;
use memefill_core::{FrameBuffer, FrameRate, Segment};
use memefill_effects::{compose, CompositionRequest, FadeSchedule};
use memefill_media::{ExportCancel, FrameSource, MemorySink, MemorySource};
use memefill_media::MediaProbe;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

const W: u32 = 16;
const H: u32 = 12;

// ── Helpers ────────────────────────────────────────────────────

/// 100 frames of a busy gray picture with frames 20-29 fully black.
fn synthetic_video() -> Vec<FrameBuffer> {
    (0..100u32)
        .map(|i| {
            if (20..30).contains(&i) {
                FrameBuffer::solid(W, H, 0, 0, 0)
            } else {
                let v = 60 + (i % 7) as u8 * 10;
                FrameBuffer::solid(W, H, v, v / 2, 255 - v)
            }
        })
        .collect()
}

fn source(frames: Vec<FrameBuffer>) -> MemorySource {
    MemorySource::new(FrameRate::FPS_10, W, H, frames).unwrap()
}

fn write_solid_png(path: &Path, rgb: [u8; 3]) {
    RgbaImage::from_pixel(20, 10, Rgba([rgb[0], rgb[1], rgb[2], 255]))
        .save(path)
        .unwrap();
}

fn compose_memory(frames: Vec<FrameBuffer>, request: &CompositionRequest) -> MemorySink {
    let mut src = source(frames);
    let mut sink = MemorySink::new(src.frame_rate(), W, H);
    compose(&mut src, &mut sink, request, &ExportCancel::new(), |_, _| {}).unwrap();
    sink
}

// ── Scenarios ──────────────────────────────────────────────────

#[test]
fn detect_then_fill_without_fade() {
    let dir = tempfile::tempdir().unwrap();
    let asset = dir.path().join("solid.png");
    write_solid_png(&asset, [10, 200, 30]);

    let input = synthetic_video();
    let segments = detect_black_segments(&mut source(input.clone()), &BlackDetectConfig::default())
        .unwrap();
    assert_eq!(segments, vec![Segment::new(20, 29)]);

    let request = CompositionRequest::new(segments, vec![asset])
        .with_zoom(2.0)
        .with_fade_millis(0);
    let sink = compose_memory(input.clone(), &request);

    assert_eq!(sink.frame_rate, FrameRate::FPS_10);
    assert_eq!((sink.width, sink.height), (W, H));
    assert_eq!(sink.frames.len(), 100);
    for (i, (out, orig)) in sink.frames.iter().zip(&input).enumerate() {
        if (20..30).contains(&i) {
            assert_eq!(*out, FrameBuffer::solid(W, H, 10, 200, 30), "frame {i}");
        } else {
            assert_eq!(out, orig, "frame {i} should pass through");
        }
    }
}

#[test]
fn half_second_fade_at_ten_fps() {
    let dir = tempfile::tempdir().unwrap();
    let asset = dir.path().join("white.png");
    write_solid_png(&asset, [255, 255, 255]);

    let fade = FadeSchedule::from_millis(500, FrameRate::FPS_10);
    let seg = Segment::new(20, 29);
    assert_eq!(fade.fade_frames(), 5);
    assert_eq!(fade.fade_start(seg), 24);

    let request = CompositionRequest::new(vec![seg], vec![asset]).with_fade_millis(500);
    let sink = compose_memory(synthetic_video(), &request);

    // Black base, white overlay: output level tracks alpha directly
    let level = |i: usize| sink.frames[i].pixel(5, 5)[0];
    for i in 20..=24 {
        assert_eq!(level(i), 255, "frame {i}");
    }
    assert_eq!(level(29), 0);
    for i in 24..29 {
        assert!(level(i) > level(i + 1), "alpha must fall across {i}..{}", i + 1);
    }
}

#[test]
fn library_sample_feeds_compositor() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("memes");
    std::fs::create_dir_all(root.join("red")).unwrap();
    std::fs::create_dir_all(root.join("blue")).unwrap();
    write_solid_png(&root.join("red/r.png"), [255, 0, 0]);
    write_solid_png(&root.join("blue/b.png"), [0, 0, 255]);
    std::fs::write(root.join("blue/notes.txt"), b"ignored").unwrap();

    let library = AssetLibrary::load(&root).unwrap();
    assert_eq!(library.categories().collect::<Vec<_>>(), vec!["blue", "red"]);

    let picked = library.sample(&["red"], 3, &mut StdRng::seed_from_u64(11));
    assert_eq!(picked, vec![root.join("red/r.png")]);

    let segments = vec![Segment::new(2, 3), Segment::new(6, 8)];
    let request = CompositionRequest::new(segments, picked).with_fade_millis(0);
    let sink = compose_memory(synthetic_video(), &request);
    // One asset cycles over both segments
    assert_eq!(sink.frames[3].pixel(0, 0), [255, 0, 0, 255]);
    assert_eq!(sink.frames[7].pixel(0, 0), [255, 0, 0, 255]);
}

#[test]
fn session_plan_drives_composition() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("memes");
    std::fs::create_dir_all(root.join("greens")).unwrap();
    write_solid_png(&root.join("greens/g.png"), [0, 255, 0]);

    let settings = Settings {
        asset_root: root,
        ..Settings::default()
    };
    let mut session = EditorSession::open(settings).unwrap();
    session.attach_video(MediaProbe {
        path: "synthetic.mp4".into(),
        codec: "rawvideo".into(),
        width: W,
        height: H,
        rotation: 0,
        frame_rate: FrameRate::FPS_10,
        frame_count: Some(100),
        duration: None,
    });

    let input = synthetic_video();
    let detected =
        detect_black_segments(&mut source(input.clone()), &BlackDetectConfig::default()).unwrap();
    session.apply_detection(detected);
    assert!(session.select_category("greens"));
    session.set_fade_ms(0).unwrap();

    let request = session.plan_composition(&mut StdRng::seed_from_u64(5)).unwrap();
    let sink = compose_memory(input, &request);
    assert_eq!(sink.frames[25].pixel(1, 1), [0, 255, 0, 255]);
    assert_eq!(sink.frames[19], synthetic_video()[19]);
}

#[test]
fn unreadable_asset_is_not_fatal() {
    let request = CompositionRequest::new(
        vec![Segment::new(20, 29)],
        vec![PathBuf::from("/no/such/meme.png")],
    );
    let input = synthetic_video();
    let sink = compose_memory(input.clone(), &request);
    assert_eq!(sink.frames, input);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn output_shape_matches_input(
        raw in prop::collection::vec((0u64..120, 0u64..15), 0..6),
        fade_ms in 0u64..2000,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("a.png");
        write_solid_png(&asset, [1, 2, 3]);

        let mut segments: Vec<Segment> = raw.iter().map(|&(s, l)| Segment::new(s, s + l)).collect();
        segments.sort_by_key(|s| s.start);
        let request = CompositionRequest::new(segments, vec![asset]).with_fade_millis(fade_ms);
        let sink = compose_memory(synthetic_video(), &request);

        prop_assert_eq!(sink.frames.len(), 100);
        prop_assert_eq!(sink.frame_rate, FrameRate::FPS_10);
        prop_assert!(sink.frames.iter().all(|f| f.dimensions() == (W, H)));
    }
}
