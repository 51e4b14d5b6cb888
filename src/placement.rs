//! Eye centers to overlay placement.
//!
//! Scale comes from the inter-eye distance alone, rotation from the eye line.
//! Every field is passed through a first-order exponential filter against the
//! previous frame's placement, which is the only state carried between frames.

use crate::canvas::DrawInstruction;
use crate::config::PlacementTuning;
use crate::face::EyeCenters;

/// Native pixel size of the overlay image being placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetDimensions {
    pub width: u32,
    pub height: u32,
}

impl AssetDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Height over width.
    pub fn aspect_ratio(&self) -> f32 {
        self.height as f32 / self.width as f32
    }
}

/// Center, size and rotation of the overlay in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    /// Radians, positive is clockwise in a Y-down frame.
    pub angle: f32,
}

impl Placement {
    fn blend(&self, raw: &Placement, alpha: f32, aspect: f32) -> Placement {
        let mix = |previous: f32, current: f32| previous * alpha + current * (1.0 - alpha);
        let width = mix(self.width, raw.width);

        Placement {
            center_x: mix(self.center_x, raw.center_x),
            center_y: mix(self.center_y, raw.center_y),
            width,
            // equal to mixing the heights while the asset is unchanged, and
            // snaps to the new ratio on the first frame after a style switch
            height: width * aspect,
            angle: mix(self.angle, raw.angle),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlacementSolver {
    tuning: PlacementTuning,
}

impl PlacementSolver {
    pub fn new(tuning: PlacementTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &PlacementTuning {
        &self.tuning
    }

    /// Unsmoothed placement for one frame.
    pub fn raw_placement(&self, eyes: &EyeCenters, asset: AssetDimensions) -> Placement {
        let t = &self.tuning;

        let center = eyes.midpoint();
        let eye_distance = eyes.distance();
        let angle = eyes.angle().max(-t.max_angle).min(t.max_angle);

        // scale relative to the reference eye distance, then keep the width
        // between the configured multiples of the eye distance
        let candidate = eye_distance / t.reference_eye_distance * asset.width as f32;
        let width = candidate
            .max(t.min_width_ratio * eye_distance)
            .min(t.max_width_ratio * eye_distance);

        Placement {
            center_x: center.x,
            center_y: center.y - t.vertical_offset,
            width,
            height: width * asset.aspect_ratio(),
            angle,
        }
    }

    /// Placement for this frame given the previous frame's smoothed placement.
    ///
    /// With no previous placement the raw values are returned as they are.
    pub fn solve(
        &self,
        previous: Option<&Placement>,
        eyes: &EyeCenters,
        asset: AssetDimensions,
    ) -> Placement {
        let raw = self.raw_placement(eyes, asset);

        match previous {
            None => raw,
            Some(previous) => previous.blend(&raw, self.tuning.smoothing_factor, asset.aspect_ratio()),
        }
    }

    pub fn instruction(&self, placement: Placement) -> DrawInstruction {
        DrawInstruction {
            placement,
            opacity: self.tuning.opacity,
        }
    }
}
