// frame acquisition and output for offline runs; live capture is left to the host
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::debug;

use crate::canvas::ImageCanvas;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub index: u64,
    pub image: RgbaImage,
}

impl CameraFrame {
    pub fn new(index: u64, image: RgbaImage) -> Self {
        Self { index, image }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

pub trait FrameSource {
    /// Next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<CameraFrame>>;
}

pub trait FrameSink {
    fn present(&mut self, frame_index: u64, canvas: ImageCanvas) -> Result<()>;
}

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Frames read from a directory of images, in file name order.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequence {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                paths.push(path);
            }
        }
        paths.sort();

        debug!("Found {} frames in {}", paths.len(), dir.display());
        Ok(Self::from_paths(paths))
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths, next: 0 }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<CameraFrame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let index = self.next as u64;
        // advance first so an unreadable file is skipped rather than retried
        self.next += 1;

        let image = image::open(path)
            .map_err(|e| Error::FrameSource(format!("{}: {}", path.display(), e)))?
            .to_rgba8();

        Ok(Some(CameraFrame::new(index, image)))
    }
}

/// Writes each composited frame as `frame_000000.png`, `frame_000001.png`, ...
pub struct PngSequence {
    dir: PathBuf,
    written: usize,
}

impl PngSequence {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameSink for PngSequence {
    fn present(&mut self, frame_index: u64, canvas: ImageCanvas) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.png", frame_index));
        canvas.into_image().save(&path)?;
        self.written += 1;
        Ok(())
    }
}
