//! The per-frame loop: landmarks in, overlay drawn.
//!
//! One tick handles one frame from start to finish, and the next frame is only
//! requested once the tick is done. The smoothed placement lives here and is
//! handed to the solver each tick; nothing else carries state between frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::canvas::{DrawSurface, ImageCanvas};
use crate::config::Config;
use crate::error::LandmarkError;
use crate::face::extract_eye_centers;
use crate::face_landmarks::LandmarkDetector;
use crate::frames::{CameraFrame, FrameSink, FrameSource};
use crate::overlay::{OverlayAsset, OverlayLoader, OverlaySlot, StyleCatalog};
use crate::placement::{Placement, PlacementSolver};
use crate::utils::FrameClock;
use crate::Result;

const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cooperative stop and pause flags, shareable with other threads.
#[derive(Debug, Clone)]
pub struct SessionControl {
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl Default for SessionControl {
    fn default() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SessionControl {
    /// The next frame is not requested. A tick already in flight finishes and
    /// its result is thrown away.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Re-arms a stopped session so the next `run` processes frames again.
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Drawn(Placement),
    NoFace,
    Rejected(LandmarkError),
    AssetNotReady,
    DetectionFailed,
    /// Stop was requested while landmarks were being detected.
    Discarded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub drawn: u64,
    pub no_face: u64,
    pub rejected: u64,
    pub asset_not_ready: u64,
    pub detection_failures: u64,
    pub discarded: u64,
    pub source_errors: u64,
    pub sink_errors: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &TickOutcome) {
        self.frames += 1;
        match outcome {
            TickOutcome::Drawn(_) => self.drawn += 1,
            TickOutcome::NoFace => self.no_face += 1,
            TickOutcome::Rejected(_) => self.rejected += 1,
            TickOutcome::AssetNotReady => self.asset_not_ready += 1,
            TickOutcome::DetectionFailed => self.detection_failures += 1,
            TickOutcome::Discarded => self.discarded += 1,
        }
    }
}

pub struct OverlaySession {
    solver: PlacementSolver,
    catalog: StyleCatalog,
    loader: OverlayLoader,
    slot: OverlaySlot,
    placement: Option<Placement>,
    control: SessionControl,
    clock: FrameClock,
    report_interval: u64,
}

impl OverlaySession {
    pub fn new(solver: PlacementSolver, catalog: StyleCatalog) -> Self {
        Self {
            solver,
            catalog,
            loader: OverlayLoader::new(),
            slot: OverlaySlot::Empty,
            placement: None,
            control: SessionControl::default(),
            clock: FrameClock::default(),
            report_interval: 30,
        }
    }

    /// Builds a session from configuration and starts loading the default style.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut session = Self::new(
            PlacementSolver::new(config.placement.clone()),
            StyleCatalog::from_config(&config.overlay),
        );
        session.report_interval = config.replay.report_interval.max(1);

        if let Some(style) = &config.overlay.default_style {
            session.select_style(style)?;
        }
        Ok(session)
    }

    pub fn control(&self) -> SessionControl {
        self.control.clone()
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    /// Starts decoding another style. Nothing is drawn until it is ready, and
    /// the smoothed placement carries over to it.
    pub fn select_style(&mut self, name: &str) -> Result<()> {
        let path = self.catalog.path(name)?.to_path_buf();
        info!("Switching overlay to '{}'", name);
        self.loader.request(name, &path);
        self.slot = OverlaySlot::Loading(name.to_string());
        Ok(())
    }

    /// Swaps in an already decoded overlay. A style still decoding is abandoned.
    pub fn set_overlay(&mut self, asset: OverlayAsset) {
        info!("Switching overlay to '{}'", asset.name);
        self.loader.cancel();
        self.slot = OverlaySlot::Ready(Arc::new(asset));
    }

    pub fn overlay(&self) -> Option<&OverlayAsset> {
        self.slot.ready().map(|a| a.as_ref())
    }

    /// Blocks until a pending style switch has finished decoding.
    pub fn wait_for_overlay(&mut self) {
        self.loader.wait(&mut self.slot);
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    /// Forgets the smoothed placement; the next detected face is placed unsmoothed.
    pub fn reset(&mut self) {
        self.placement = None;
    }

    pub fn tick<D, S>(&mut self, frame: &CameraFrame, detector: &mut D, surface: &mut S) -> TickOutcome
    where
        D: LandmarkDetector + ?Sized,
        S: DrawSurface + ?Sized,
    {
        self.loader.poll(&mut self.slot);
        surface.clear();

        let detected = match detector.detect(frame) {
            Ok(detected) => detected,
            Err(e) => {
                warn!("Landmark detection failed on frame {}: {}", frame.index, e);
                return TickOutcome::DetectionFailed;
            }
        };

        if !self.control.is_running() {
            debug!("Discarding landmarks for frame {} after stop", frame.index);
            return TickOutcome::Discarded;
        }

        let Some(landmarks) = detected else {
            trace!("No face in frame {}", frame.index);
            return TickOutcome::NoFace;
        };

        let features = match extract_eye_centers(&landmarks) {
            Ok(features) => features,
            Err(e) => {
                debug!("Skipping frame {}: {}", frame.index, e);
                return TickOutcome::Rejected(e);
            }
        };

        let Some(asset) = self.slot.ready().cloned() else {
            trace!("Overlay not ready for frame {}", frame.index);
            return TickOutcome::AssetNotReady;
        };

        let placement =
            self.solver
                .solve(self.placement.as_ref(), &features.eyes, asset.dimensions());
        self.placement = Some(placement);

        trace!(
            "Frame {}: center=({:.1}, {:.1}) size={:.1}x{:.1} angle={:.3}",
            frame.index,
            placement.center_x,
            placement.center_y,
            placement.width,
            placement.height,
            placement.angle
        );

        self.solver.instruction(placement).apply(&asset, surface);
        TickOutcome::Drawn(placement)
    }

    /// Pulls frames from `source` until it runs dry or a stop is requested,
    /// compositing each one and handing it to `sink`.
    ///
    /// A stop, including one issued before the call, ends the run and drops the
    /// smoothed placement, so the next run after [`SessionControl::start`]
    /// places the first face unsmoothed. A run that ends because the source
    /// ran dry keeps it.
    pub fn run<F, D, K>(&mut self, source: &mut F, detector: &mut D, sink: &mut K) -> RunSummary
    where
        F: FrameSource + ?Sized,
        D: LandmarkDetector + ?Sized,
        K: FrameSink + ?Sized,
    {
        let mut summary = RunSummary::default();
        self.clock.reset_anchor();

        loop {
            if !self.control.is_running() {
                info!("Stop requested after {} frames", summary.frames);
                self.reset();
                break;
            }

            if self.control.is_paused() {
                self.clock.reset_anchor();
                std::thread::sleep(PAUSE_POLL_INTERVAL);
                continue;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Frame source exhausted after {} frames", summary.frames);
                    break;
                }
                Err(e) => {
                    warn!("Failed to read frame: {}", e);
                    summary.source_errors += 1;
                    continue;
                }
            };

            let mut canvas = ImageCanvas::new(frame.image.clone());
            let outcome = self.tick(&frame, detector, &mut canvas);
            summary.record(&outcome);

            if outcome == TickOutcome::Discarded {
                continue;
            }

            if let Err(e) = sink.present(frame.index, canvas) {
                warn!("Failed to present frame {}: {}", frame.index, e);
                summary.sink_errors += 1;
            }

            self.clock.tick();
            if summary.frames % self.report_interval == 0 {
                if let Some(fps) = self.clock.fps() {
                    info!(
                        "{} frames, {:.1} fps, overlay drawn on {}",
                        summary.frames, fps, summary.drawn
                    );
                }
            }
        }

        summary
    }
}
