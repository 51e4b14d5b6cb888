//! Configuration loading for face-overlay

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Error};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub overlay: OverlayConfig,
    pub placement: PlacementTuning,
    pub replay: ReplayConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, Error> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from the first default path that exists
    pub fn load() -> Result<Self, Error> {
        let paths = [
            PathBuf::from("face-overlay.toml"),
            PathBuf::from("config/face-overlay.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), Error> {
        let p = &self.placement;

        if !(0.0..1.0).contains(&p.smoothing_factor) {
            return Err(invalid(
                "placement.smoothing_factor",
                "Smoothing factor must be in [0.0, 1.0)",
            ));
        }

        if p.reference_eye_distance <= 0.0 {
            return Err(invalid(
                "placement.reference_eye_distance",
                "Reference eye distance must be greater than 0",
            ));
        }

        if p.max_angle < 0.0 {
            return Err(invalid(
                "placement.max_angle",
                "Angle limit must not be negative",
            ));
        }

        if p.min_width_ratio <= 0.0 || p.min_width_ratio > p.max_width_ratio {
            return Err(invalid(
                "placement.min_width_ratio",
                "Width ratios must satisfy 0 < min_width_ratio <= max_width_ratio",
            ));
        }

        if !(0.0..=1.0).contains(&p.opacity) {
            return Err(invalid(
                "placement.opacity",
                "Opacity must be between 0.0 and 1.0",
            ));
        }

        if let Some(style) = &self.overlay.default_style {
            if !self.overlay.styles.contains_key(style) {
                return Err(invalid(
                    "overlay.default_style",
                    &format!("Style '{}' is not listed in overlay.styles", style),
                ));
            }
        }

        if self.replay.report_interval == 0 {
            return Err(invalid(
                "replay.report_interval",
                "Report interval must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Overlay styles, by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Style selected at startup
    pub default_style: Option<String>,
    /// Style name -> image path
    pub styles: BTreeMap<String, PathBuf>,
}

/// Constants of the placement solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementTuning {
    /// Weight of the previous frame's placement
    pub smoothing_factor: f32,
    /// Eye distance, in overlay pixels, at which the overlay is drawn at native size
    pub reference_eye_distance: f32,
    /// Upward shift of the overlay center from the eye midpoint
    pub vertical_offset: f32,
    /// Rotation limit in radians
    pub max_angle: f32,
    pub min_width_ratio: f32,
    pub max_width_ratio: f32,
    pub opacity: f32,
}

impl Default for PlacementTuning {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.6,
            reference_eye_distance: 80.0,
            vertical_offset: 5.0,
            max_angle: 0.1,
            min_width_ratio: 1.8,
            max_width_ratio: 2.5,
            opacity: 0.9,
        }
    }
}

/// Offline replay of recorded frames and landmarks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Landmark records hold [0, 1] coordinates instead of pixels
    pub normalized: bool,
    /// Frames between frame rate reports
    pub report_interval: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            normalized: false,
            report_interval: 30,
        }
    }
}
