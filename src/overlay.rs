use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::config::OverlayConfig;
use crate::placement::AssetDimensions;
use crate::{Error, Result};

/// A decoded overlay image, ready to draw.
#[derive(Debug, Clone)]
pub struct OverlayAsset {
    pub name: String,
    pub image: RgbaImage,
}

impl OverlayAsset {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self> {
        let image = image::open(path)?.to_rgba8();
        Ok(Self::new(name, image))
    }

    pub fn dimensions(&self) -> AssetDimensions {
        AssetDimensions::new(self.image.width(), self.image.height())
    }

    // a zero-sized image decodes fine but has no aspect ratio
    pub fn is_drawable(&self) -> bool {
        self.image.width() > 0 && self.image.height() > 0
    }
}

/// The currently selected overlay.
#[derive(Debug, Clone, Default)]
pub enum OverlaySlot {
    #[default]
    Empty,
    Loading(String),
    Ready(Arc<OverlayAsset>),
}

impl OverlaySlot {
    pub fn ready(&self) -> Option<&Arc<OverlayAsset>> {
        match self {
            OverlaySlot::Ready(asset) if asset.is_drawable() => Some(asset),
            _ => None,
        }
    }
}

/// Style name to image path lookup.
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    styles: BTreeMap<String, PathBuf>,
}

impl StyleCatalog {
    pub fn new(styles: BTreeMap<String, PathBuf>) -> Self {
        Self { styles }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(config.styles.clone())
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.styles.insert(name.into(), path.into());
    }

    pub fn path(&self, name: &str) -> Result<&Path> {
        self.styles
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::UnknownStyle(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }
}

type LoadResult = (String, Result<OverlayAsset>);

/// Decodes overlay images on worker threads.
///
/// Results come back through a channel and are picked up by [`OverlayLoader::poll`],
/// so decoding never blocks a tick. Only the most recent request is honored.
pub struct OverlayLoader {
    sender: Sender<LoadResult>,
    receiver: Receiver<LoadResult>,
    pending: Option<String>,
}

impl Default for OverlayLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayLoader {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            pending: None,
        }
    }

    pub fn request(&mut self, name: &str, path: &Path) {
        let sender = self.sender.clone();
        let name = name.to_string();
        let path = path.to_path_buf();

        debug!("Decoding overlay '{}' from {}", name, path.display());
        self.pending = Some(name.clone());

        std::thread::spawn(move || {
            let result = OverlayAsset::load(name.clone(), &path);
            // the loader may be gone by now; nothing to report to
            let _ = sender.send((name, result));
        });
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Forgets the pending request; its result is dropped as stale when it lands.
    pub fn cancel(&mut self) {
        if let Some(name) = self.pending.take() {
            debug!("Cancelled overlay '{}'", name);
        }
    }

    /// Applies any finished decode to `slot`. Returns true when the slot changed.
    pub fn poll(&mut self, slot: &mut OverlaySlot) -> bool {
        let mut changed = false;
        while let Ok(message) = self.receiver.try_recv() {
            changed |= self.apply(message, slot);
        }
        changed
    }

    /// Blocks until the pending decode, if any, has been applied.
    pub fn wait(&mut self, slot: &mut OverlaySlot) {
        while self.pending.is_some() {
            match self.receiver.recv() {
                Ok(message) => {
                    self.apply(message, slot);
                }
                Err(_) => break,
            }
        }
    }

    fn apply(&mut self, (name, result): LoadResult, slot: &mut OverlaySlot) -> bool {
        if self.pending.as_deref() != Some(name.as_str()) {
            debug!("Dropping stale overlay '{}'", name);
            return false;
        }
        self.pending = None;

        match result {
            Ok(asset) => {
                info!(
                    "Overlay '{}' ready ({}x{})",
                    name,
                    asset.image.width(),
                    asset.image.height()
                );
                *slot = OverlaySlot::Ready(Arc::new(asset));
                true
            }
            Err(e) => {
                warn!("Failed to load overlay '{}': {}", name, e);
                match slot {
                    OverlaySlot::Loading(_) => {
                        *slot = OverlaySlot::Empty;
                        true
                    }
                    _ => false,
                }
            }
        }
    }
}
