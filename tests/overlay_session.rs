//! End-to-end runs of the overlay session over recorded frames and landmarks.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use nalgebra::Point2;

use face_overlay::{
    CameraFrame, Config, FrameSink, FrameSource, ImageCanvas, ImageSequence, LandmarkDetector,
    LandmarkSet, OverlayAsset, OverlaySession, Placement, PlacementSolver, PngSequence,
    ReplayDetector, StyleCatalog,
};

// landmark record whose eye centers land on `left` and `right`
fn record(left: (f32, f32), right: (f32, f32)) -> String {
    let mut points: Vec<Option<[f32; 2]>> = vec![Some([1.0, 1.0]); 478];
    for (c, inner, outer, top) in [(left, 133, 33, 159), (right, 362, 263, 386)] {
        points[inner] = Some([c.0 + 10.0, c.1]);
        points[outer] = Some([c.0 - 10.0, c.1]);
        points[top] = Some([c.0, c.1]);
    }
    serde_json::json!({ "landmarks": points }).to_string()
}

fn write_frames(dir: &Path, count: usize) {
    for i in 0..count {
        RgbaImage::from_pixel(320, 240, Rgba([0, 0, 0, 255]))
            .save(dir.join(format!("{:03}.png", i)))
            .unwrap();
    }
}

fn assert_close(p: &Placement, x: f32, y: f32, width: f32, height: f32) {
    assert!((p.center_x - x).abs() < 1e-3, "{:?}", p);
    assert!((p.center_y - y).abs() < 1e-3, "{:?}", p);
    assert!((p.width - width).abs() < 1e-3, "{:?}", p);
    assert!((p.height - height).abs() < 1e-3, "{:?}", p);
    assert!(p.angle.abs() < 1e-6, "{:?}", p);
}

struct Collect {
    frames: Vec<(u64, RgbaImage)>,
}

impl FrameSink for Collect {
    fn present(&mut self, frame_index: u64, canvas: ImageCanvas) -> face_overlay::Result<()> {
        self.frames.push((frame_index, canvas.into_image()));
        Ok(())
    }
}

#[test]
fn replay_draws_overlay_on_every_tracked_frame() {
    let dir = tempfile::tempdir().unwrap();
    let frames_dir = dir.path().join("frames");
    std::fs::create_dir(&frames_dir).unwrap();
    write_frames(&frames_dir, 4);

    let overlay_path = dir.path().join("glasses.png");
    RgbaImage::from_pixel(200, 80, Rgba([255, 255, 255, 255]))
        .save(&overlay_path)
        .unwrap();

    let config = Config::from_str(&format!(
        "[overlay]\ndefault_style = \"glasses\"\nstyles = {{ glasses = {:?} }}\n",
        overlay_path.display().to_string()
    ))
    .unwrap();
    config.validate().unwrap();

    let mut session = OverlaySession::from_config(&config).unwrap();
    session.wait_for_overlay();

    let landmarks = [
        record((100.0, 200.0), (140.0, 200.0)),
        "{\"landmarks\": null}".to_string(),
        "not json".to_string(),
        record((100.0, 200.0), (140.0, 200.0)),
    ]
    .join("\n");

    let mut source = ImageSequence::open(&frames_dir).unwrap();
    let mut detector = ReplayDetector::from_reader(Cursor::new(landmarks), false);
    let mut sink = Collect { frames: Vec::new() };

    let summary = session.run(&mut source, &mut detector, &mut sink);

    assert_eq!(summary.frames, 4);
    assert_eq!(summary.drawn, 2);
    assert_eq!(summary.no_face, 1);
    assert_eq!(summary.detection_failures, 1);
    assert_eq!(sink.frames.len(), 4);

    // identical input twice: second frame is smoothed onto the same spot
    let placement = session.placement().copied().unwrap();
    assert_close(&placement, 120.0, 195.0, 100.0, 40.0);

    // overlay drawn around the face center at 0.9 opacity, frame without face untouched
    let (_, drawn) = &sink.frames[0];
    let center = drawn.get_pixel(120, 195).0;
    assert!((center[0] as i32 - 230).abs() <= 1, "{:?}", center);
    assert_eq!(drawn.get_pixel(10, 10).0, [0, 0, 0, 255]);

    let (_, skipped) = &sink.frames[1];
    assert_eq!(skipped.get_pixel(120, 195).0, [0, 0, 0, 255]);
}

#[test]
fn png_output_is_written_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    let frames_dir = dir.path().join("frames");
    std::fs::create_dir(&frames_dir).unwrap();
    write_frames(&frames_dir, 2);

    let mut session = OverlaySession::new(PlacementSolver::default(), StyleCatalog::default());
    session.set_overlay(OverlayAsset::new("bar", RgbaImage::new(60, 20)));

    let landmarks = format!(
        "{}\n{}\n",
        record((100.0, 120.0), (150.0, 120.0)),
        record((102.0, 121.0), (152.0, 121.0))
    );
    let mut source = ImageSequence::open(&frames_dir).unwrap();
    let mut detector = ReplayDetector::from_reader(Cursor::new(landmarks), false);
    let mut sink = PngSequence::create(&dir.path().join("out")).unwrap();

    let summary = session.run(&mut source, &mut detector, &mut sink);

    assert_eq!(summary.drawn, 2);
    assert_eq!(sink.written(), 2);
    assert!(dir.path().join("out/frame_000000.png").exists());
    assert!(dir.path().join("out/frame_000001.png").exists());
}

// blank frames, endless unless `remaining` is set
struct Blank {
    next: u64,
    remaining: Option<u64>,
}

impl Blank {
    fn endless() -> Self {
        Self {
            next: 0,
            remaining: None,
        }
    }
}

impl FrameSource for Blank {
    fn next_frame(&mut self) -> face_overlay::Result<Option<CameraFrame>> {
        match &mut self.remaining {
            Some(0) => return Ok(None),
            Some(n) => *n -= 1,
            None => {}
        }
        let frame = CameraFrame::new(self.next, RgbaImage::new(96, 48));
        self.next += 1;
        Ok(Some(frame))
    }
}

// always sees the same face and lets the test poke the session control
struct SameFace<F: FnMut(u64)> {
    face: LandmarkSet,
    hook: F,
}

impl<F: FnMut(u64)> LandmarkDetector for SameFace<F> {
    fn detect(&mut self, frame: &CameraFrame) -> face_overlay::Result<Option<LandmarkSet>> {
        (self.hook)(frame.index);
        Ok(Some(self.face.clone()))
    }
}

// eyes 40px apart at y = 20, shifted right by `dx`
fn face_at(dx: f32) -> LandmarkSet {
    let mut set = LandmarkSet::from_points(vec![Point2::new(1.0, 1.0); 478]);
    for (i, x) in [
        (133, 30.0),
        (33, 10.0),
        (159, 20.0),
        (362, 50.0),
        (263, 70.0),
        (386, 60.0),
    ] {
        set.set_landmark(i, Some(Point2::new(x + dx, 20.0)));
    }
    set
}

#[test]
fn stop_ends_the_loop_and_discards_the_in_flight_frame() {
    let mut session = OverlaySession::new(PlacementSolver::default(), StyleCatalog::default());
    session.set_overlay(OverlayAsset::new("bar", RgbaImage::new(80, 20)));
    let control = session.control();

    let mut detector = SameFace {
        face: face_at(0.0),
        hook: move |index: u64| {
            if index == 5 {
                control.stop();
            }
        },
    };
    let mut sink = Collect { frames: Vec::new() };

    let summary = session.run(&mut Blank::endless(), &mut detector, &mut sink);

    assert_eq!(summary.frames, 6);
    assert_eq!(summary.drawn, 5);
    assert_eq!(summary.discarded, 1);
    assert_eq!(sink.frames.len(), 5);
    assert!(!session.control().is_running());
    assert!(session.placement().is_none());

    // still stopped: nothing is pulled until the session is re-armed
    let mut detector = SameFace {
        face: face_at(10.0),
        hook: |_: u64| {},
    };
    let mut source = Blank {
        next: 100,
        remaining: Some(1),
    };
    let summary = session.run(&mut source, &mut detector, &mut sink);
    assert_eq!(summary.frames, 0);

    // after a restart the first face is placed unsmoothed
    session.control().start();
    let summary = session.run(&mut source, &mut detector, &mut sink);
    assert_eq!(summary.drawn, 1);
    assert_close(&session.placement().copied().unwrap(), 50.0, 15.0, 72.0, 18.0);
}

#[test]
fn pause_and_resume_keep_the_smoothing_anchor() {
    let mut session = OverlaySession::new(PlacementSolver::default(), StyleCatalog::default());
    session.set_overlay(OverlayAsset::new("bar", RgbaImage::new(80, 20)));
    let control = session.control();

    let mut detector = SameFace {
        face: face_at(0.0),
        hook: move |index: u64| match index {
            2 => {
                control.pause();
                let control = control.clone();
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(30));
                    control.resume();
                });
            }
            _ => {}
        },
    };
    let mut sink = Collect { frames: Vec::new() };
    let mut source = Blank {
        next: 0,
        remaining: Some(4),
    };

    let summary = session.run(&mut source, &mut detector, &mut sink);

    // frames 0..=3 drawn across the pause
    assert_eq!(summary.drawn, 4);
    assert_eq!(summary.discarded, 0);
    assert!(!session.control().is_paused());

    // 80x20 asset, eye distance 40: raw width 40 is under the 1.8 floor
    let anchor = session.placement().copied().unwrap();
    assert_close(&anchor, 40.0, 15.0, 72.0, 18.0);

    // a later run over more frames blends from the same anchor
    let mut detector = SameFace {
        face: face_at(10.0),
        hook: |_: u64| {},
    };
    let mut source = Blank {
        next: 100,
        remaining: Some(1),
    };
    let summary = session.run(&mut source, &mut detector, &mut sink);

    assert_eq!(summary.drawn, 1);
    let blended = session.placement().copied().unwrap();
    assert_close(&blended, 44.0, 15.0, 72.0, 18.0);
}
