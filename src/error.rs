use thiserror::Error;

use crate::face::LandmarkPoint;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Landmark detection failed: {0}")]
    Detection(String),

    #[error("Frame source failed: {0}")]
    FrameSource(String),

    #[error("Unknown overlay style: {0}")]
    UnknownStyle(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Reasons a landmark set cannot produce eye centers for this frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LandmarkError {
    #[error("landmark set has {len} points, need at least {required}")]
    TooFewLandmarks { len: usize, required: usize },

    #[error("landmark {point:?} (index {index}) is missing or not finite")]
    MissingLandmark { point: LandmarkPoint, index: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
