use nalgebra::Point2;

use crate::error::LandmarkError;
use crate::face_landmarks::LandmarkSet;

// the nose bridge (index 168) is the last point a set must reach
pub const MIN_LANDMARK_COUNT: usize = 169;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkPoint {
    LeftEyeInner,
    LeftEyeOuter,
    LeftEyeTop,
    RightEyeInner,
    RightEyeOuter,
    RightEyeTop,
    NoseTip,
    NoseBridge,
}

impl LandmarkPoint {
    // face mesh index convention
    pub fn index(self) -> usize {
        match self {
            LandmarkPoint::LeftEyeInner => 133,
            LandmarkPoint::LeftEyeOuter => 33,
            LandmarkPoint::LeftEyeTop => 159,
            LandmarkPoint::RightEyeInner => 362,
            LandmarkPoint::RightEyeOuter => 263,
            LandmarkPoint::RightEyeTop => 386,
            LandmarkPoint::NoseTip => 1,
            LandmarkPoint::NoseBridge => 168,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeCenters {
    pub left: Point2<f32>,
    pub right: Point2<f32>,
}

impl EyeCenters {
    pub fn new(left: Point2<f32>, right: Point2<f32>) -> Self {
        Self { left, right }
    }

    pub fn distance(&self) -> f32 {
        nalgebra::distance(&self.left, &self.right)
    }

    pub fn midpoint(&self) -> Point2<f32> {
        nalgebra::center(&self.left, &self.right)
    }

    // angle of the left -> right vector; positive is clockwise with Y pointing down
    pub fn angle(&self) -> f32 {
        let d = self.right - self.left;
        d.y.atan2(d.x)
    }
}

/// Per-frame geometry read from a landmark set.
///
/// The nose points are carried along for callers that want them; placement
/// only looks at the eye centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceFeatures {
    pub eyes: EyeCenters,
    pub nose_tip: Option<Point2<f32>>,
    pub nose_bridge: Option<Point2<f32>>,
}

pub fn extract_eye_centers(landmarks: &LandmarkSet) -> Result<FaceFeatures, LandmarkError> {
    if landmarks.len() < MIN_LANDMARK_COUNT {
        return Err(LandmarkError::TooFewLandmarks {
            len: landmarks.len(),
            required: MIN_LANDMARK_COUNT,
        });
    }

    let get = |point: LandmarkPoint| {
        landmarks
            .get_landmark(point.index())
            .ok_or(LandmarkError::MissingLandmark {
                point,
                index: point.index(),
            })
    };

    let left = eye_center(
        get(LandmarkPoint::LeftEyeInner)?,
        get(LandmarkPoint::LeftEyeOuter)?,
        get(LandmarkPoint::LeftEyeTop)?,
    );
    let right = eye_center(
        get(LandmarkPoint::RightEyeInner)?,
        get(LandmarkPoint::RightEyeOuter)?,
        get(LandmarkPoint::RightEyeTop)?,
    );

    Ok(FaceFeatures {
        eyes: EyeCenters::new(left, right),
        nose_tip: landmarks.get_landmark(LandmarkPoint::NoseTip.index()),
        nose_bridge: landmarks.get_landmark(LandmarkPoint::NoseBridge.index()),
    })
}

// the top landmark only pulls the vertical position
fn eye_center(inner: Point2<f32>, outer: Point2<f32>, top: Point2<f32>) -> Point2<f32> {
    Point2::new(
        (inner.x + outer.x) / 2.0,
        (inner.y + outer.y + top.y) / 3.0,
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    // 478-point set with every eye landmark placed so the eye centers land on
    // `left` and `right`
    pub(crate) fn landmarks_for_eyes(left: (f32, f32), right: (f32, f32)) -> LandmarkSet {
        let mut set = LandmarkSet::from_points(vec![Point2::new(1.0, 1.0); 478]);
        for (center, inner, outer, top) in [
            (
                left,
                LandmarkPoint::LeftEyeInner,
                LandmarkPoint::LeftEyeOuter,
                LandmarkPoint::LeftEyeTop,
            ),
            (
                right,
                LandmarkPoint::RightEyeInner,
                LandmarkPoint::RightEyeOuter,
                LandmarkPoint::RightEyeTop,
            ),
        ] {
            set.set_landmark(inner.index(), Some(Point2::new(center.0 + 10.0, center.1)));
            set.set_landmark(outer.index(), Some(Point2::new(center.0 - 10.0, center.1)));
            set.set_landmark(top.index(), Some(Point2::new(center.0, center.1)));
        }
        set
    }

    #[test]
    fn eye_centers_from_corners_and_top() {
        let mut set = LandmarkSet::from_points(vec![Point2::new(0.0, 0.0); 478]);
        set.set_landmark(133, Some(Point2::new(110.0, 198.0)));
        set.set_landmark(33, Some(Point2::new(90.0, 202.0)));
        set.set_landmark(159, Some(Point2::new(100.0, 190.0)));
        set.set_landmark(362, Some(Point2::new(130.0, 200.0)));
        set.set_landmark(263, Some(Point2::new(150.0, 200.0)));
        set.set_landmark(386, Some(Point2::new(0.0, 200.0)));

        let features = extract_eye_centers(&set).unwrap();

        // top x never contributes
        assert_eq!(features.eyes.left, Point2::new(100.0, 590.0 / 3.0));
        assert_eq!(features.eyes.right, Point2::new(140.0, 200.0));
    }

    #[test]
    fn nose_points_are_carried_but_optional() {
        let mut set = landmarks_for_eyes((100.0, 200.0), (140.0, 200.0));
        set.set_landmark(1, Some(Point2::new(120.0, 230.0)));
        set.set_landmark(168, None);

        let features = extract_eye_centers(&set).unwrap();
        assert_eq!(features.nose_tip, Some(Point2::new(120.0, 230.0)));
        assert_eq!(features.nose_bridge, None);
    }

    #[test]
    fn short_landmark_sets_are_rejected() {
        let set = LandmarkSet::from_points(vec![Point2::new(1.0, 1.0); 168]);
        assert_eq!(
            extract_eye_centers(&set),
            Err(LandmarkError::TooFewLandmarks {
                len: 168,
                required: 169
            })
        );
    }

    #[test]
    fn missing_eye_top_is_rejected() {
        // 169 points, index 159 undefined; 362/263/386 are past the end
        let mut set = LandmarkSet::from_points(vec![Point2::new(1.0, 1.0); 169]);
        set.set_landmark(159, None);

        assert_eq!(
            extract_eye_centers(&set),
            Err(LandmarkError::MissingLandmark {
                point: LandmarkPoint::LeftEyeTop,
                index: 159
            })
        );
    }

    #[test]
    fn every_eye_landmark_is_required() {
        for point in [
            LandmarkPoint::LeftEyeInner,
            LandmarkPoint::LeftEyeOuter,
            LandmarkPoint::LeftEyeTop,
            LandmarkPoint::RightEyeInner,
            LandmarkPoint::RightEyeOuter,
            LandmarkPoint::RightEyeTop,
        ] {
            let mut set = landmarks_for_eyes((100.0, 200.0), (140.0, 200.0));
            set.set_landmark(point.index(), Some(Point2::new(f32::INFINITY, 0.0)));
            assert!(
                matches!(
                    extract_eye_centers(&set),
                    Err(LandmarkError::MissingLandmark { point: p, .. }) if p == point
                ),
                "{:?} should be required",
                point
            );
        }
    }

    #[test]
    fn eye_pair_geometry() {
        let eyes = EyeCenters::new(Point2::new(0.0, 0.0), Point2::new(30.0, 40.0));
        assert_eq!(eyes.distance(), 50.0);
        assert_eq!(eyes.midpoint(), Point2::new(15.0, 20.0));
        assert!((eyes.angle() - (40.0f32).atan2(30.0)).abs() < 1e-6);
    }
}
