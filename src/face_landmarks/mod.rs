pub mod replay;

use nalgebra::Point2;

use crate::frames::CameraFrame;
use crate::Result;

// ordered set of 2D face mesh points for one detected face, in frame pixels.
// a slot is None when the model did not report that point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Option<Point2<f32>>>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Option<Point2<f32>>>) -> Self {
        Self { points }
    }

    pub fn from_points(points: Vec<Point2<f32>>) -> Self {
        Self {
            points: points.into_iter().map(Some).collect(),
        }
    }

    /// Returns the landmark at `index`, or `None` when it is absent or not finite.
    pub fn get_landmark(&self, index: usize) -> Option<Point2<f32>> {
        self.points
            .get(index)
            .copied()
            .flatten()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
    }

    pub fn get_landmarks(&self) -> &[Option<Point2<f32>>] {
        &self.points
    }

    pub fn set_landmark(&mut self, index: usize, point: Option<Point2<f32>>) {
        if index >= self.points.len() {
            self.points.resize(index + 1, None);
        }
        self.points[index] = point;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    // convert from normalized [0, 1] model coordinates to pixel coordinates
    pub fn to_pixels(&self, width: u32, height: u32) -> LandmarkSet {
        let (w, h) = (width as f32, height as f32);
        LandmarkSet {
            points: self
                .points
                .iter()
                .map(|p| p.map(|p| Point2::new(p.x * w, p.y * h)))
                .collect(),
        }
    }
}

// the landmark model is external; anything that turns a frame into at most one
// landmark set can drive the overlay
pub trait LandmarkDetector {
    fn detect(&mut self, frame: &CameraFrame) -> Result<Option<LandmarkSet>>;
}
