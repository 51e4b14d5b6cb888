//! # face-overlay
//!
//! Places a 2D overlay image (glasses, masks, ...) on a face in a video stream
//! from face mesh landmarks.
//!
//! Per frame:
//! 1. a [`LandmarkDetector`] yields at most one [`LandmarkSet`];
//! 2. [`face::extract_eye_centers`] reduces it to two eye centers;
//! 3. [`PlacementSolver`] turns them into a center, size and rotation, smoothed
//!    against the previous frame;
//! 4. the resulting [`DrawInstruction`] is replayed on a [`DrawSurface`].
//!
//! [`OverlaySession`] strings these together and owns the smoothing state.

pub mod canvas;
pub mod config;
mod error;
pub mod face;
pub mod face_landmarks;
pub mod frames;
pub mod overlay;
pub mod placement;
pub mod session;
pub mod utils;

pub use canvas::{DrawCommand, DrawInstruction, DrawSurface, ImageCanvas, RecordingSurface};
pub use config::{Config, PlacementTuning};
pub use error::{ConfigError, Error, LandmarkError, Result};
pub use face::{EyeCenters, FaceFeatures, LandmarkPoint};
pub use face_landmarks::{replay::ReplayDetector, LandmarkDetector, LandmarkSet};
pub use frames::{CameraFrame, FrameSink, FrameSource, ImageSequence, PngSequence};
pub use overlay::{OverlayAsset, OverlaySlot, StyleCatalog};
pub use placement::{AssetDimensions, Placement, PlacementSolver};
pub use session::{OverlaySession, RunSummary, SessionControl, TickOutcome};
