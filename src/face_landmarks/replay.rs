use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::Point2;
use serde::Deserialize;

use crate::face_landmarks::{LandmarkDetector, LandmarkSet};
use crate::frames::CameraFrame;
use crate::Result;

// one line of a recording: the first tracked face for one frame, or null
#[derive(Debug, Deserialize)]
struct LandmarkRecord {
    #[serde(default)]
    landmarks: Option<Vec<Option<[f32; 2]>>>,
}

/// Plays back landmarks recorded from a face mesh model, one JSON line per frame.
///
/// ```text
/// {"landmarks": [[412.0, 230.5], null, [415.2, 228.0], ...]}
/// {"landmarks": null}
/// ```
pub struct ReplayDetector<R> {
    lines: std::io::Lines<R>,
    normalized: bool,
    line_number: usize,
}

impl ReplayDetector<BufReader<File>> {
    pub fn open(path: &Path, normalized: bool) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file), normalized))
    }
}

impl<R: BufRead> ReplayDetector<R> {
    pub fn from_reader(reader: R, normalized: bool) -> Self {
        Self {
            lines: reader.lines(),
            normalized,
            line_number: 0,
        }
    }
}

impl<R: BufRead> LandmarkDetector for ReplayDetector<R> {
    fn detect(&mut self, frame: &CameraFrame) -> Result<Option<LandmarkSet>> {
        let Some(line) = self.lines.next() else {
            return Ok(None);
        };
        let line = line?;
        self.line_number += 1;

        if line.trim().is_empty() {
            return Ok(None);
        }

        let record: LandmarkRecord = serde_json::from_str(&line).map_err(|e| {
            crate::Error::Detection(format!("line {}: {}", self.line_number, e))
        })?;

        let Some(points) = record.landmarks else {
            return Ok(None);
        };

        let set = LandmarkSet::new(
            points
                .into_iter()
                .map(|p| p.map(|[x, y]| Point2::new(x, y)))
                .collect(),
        );

        if self.normalized {
            let (w, h) = frame.dimensions();
            Ok(Some(set.to_pixels(w, h)))
        } else {
            Ok(Some(set))
        }
    }
}
