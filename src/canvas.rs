//! Drawing surfaces.
//!
//! The session only speaks [`DrawSurface`]: a small 2D-context style API with a
//! transform stack and a global alpha. [`ImageCanvas`] rasterizes onto the
//! camera frame, [`RecordingSurface`] keeps the calls for someone else to replay.

use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use rayon::prelude::*;

use crate::overlay::OverlayAsset;
use crate::placement::Placement;

pub trait DrawSurface {
    fn size(&self) -> (u32, u32);
    fn clear(&mut self);
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f32, y: f32);
    /// Radians, clockwise with Y pointing down.
    fn rotate(&mut self, angle: f32);
    fn set_global_alpha(&mut self, alpha: f32);
    /// Draws `asset` stretched to the `width` x `height` rectangle at (`x`, `y`)
    /// in the current coordinate space.
    fn draw_image(&mut self, asset: &OverlayAsset, x: f32, y: f32, width: f32, height: f32);
}

/// Where and how strongly to draw the overlay this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawInstruction {
    pub placement: Placement,
    pub opacity: f32,
}

impl DrawInstruction {
    pub fn apply<S: DrawSurface + ?Sized>(&self, asset: &OverlayAsset, surface: &mut S) {
        let p = &self.placement;

        surface.save();
        surface.translate(p.center_x, p.center_y);
        surface.rotate(p.angle);
        surface.set_global_alpha(self.opacity);
        surface.draw_image(asset, -p.width / 2.0, -p.height / 2.0, p.width, p.height);
        surface.restore();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    Save,
    Restore,
    Translate { x: f32, y: f32 },
    Rotate { angle: f32 },
    SetGlobalAlpha { alpha: f32 },
    DrawImage {
        asset: String,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub width: u32,
    pub height: u32,
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::DrawImage { .. }))
            .count()
    }
}

impl DrawSurface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.commands.push(DrawCommand::Translate { x, y });
    }

    fn rotate(&mut self, angle: f32) {
        self.commands.push(DrawCommand::Rotate { angle });
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.commands.push(DrawCommand::SetGlobalAlpha { alpha });
    }

    fn draw_image(&mut self, asset: &OverlayAsset, x: f32, y: f32, width: f32, height: f32) {
        self.commands.push(DrawCommand::DrawImage {
            asset: asset.name.clone(),
            x,
            y,
            width,
            height,
        });
    }
}

/// Raster surface over a camera frame.
///
/// `clear` puts the untouched frame back, so each tick starts from the camera
/// image rather than from last tick's composite.
pub struct ImageCanvas {
    background: RgbaImage,
    image: RgbaImage,
    transform: Projection,
    alpha: f32,
    stack: Vec<(Projection, f32)>,
}

impl ImageCanvas {
    pub fn new(frame: RgbaImage) -> Self {
        Self {
            image: frame.clone(),
            background: frame,
            transform: identity(),
            alpha: 1.0,
            stack: Vec::new(),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

fn identity() -> Projection {
    Projection::scale(1.0, 1.0)
}

impl DrawSurface for ImageCanvas {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self) {
        self.image.clone_from(&self.background);
        self.transform = identity();
        self.alpha = 1.0;
        self.stack.clear();
    }

    fn save(&mut self) {
        self.stack.push((self.transform, self.alpha));
    }

    fn restore(&mut self) {
        if let Some((transform, alpha)) = self.stack.pop() {
            self.transform = transform;
            self.alpha = alpha;
        }
    }

    // new operations act in the current local space, so they go on the right
    fn translate(&mut self, x: f32, y: f32) {
        self.transform = self.transform * Projection::translate(x, y);
    }

    fn rotate(&mut self, angle: f32) {
        self.transform = self.transform * Projection::rotate(angle);
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    fn draw_image(&mut self, asset: &OverlayAsset, x: f32, y: f32, width: f32, height: f32) {
        let (src_w, src_h) = asset.image.dimensions();
        if src_w == 0 || src_h == 0 || width <= 0.0 || height <= 0.0 || self.alpha <= 0.0 {
            return;
        }

        // asset pixels -> destination rectangle -> frame
        let projection = self.transform
            * Projection::translate(x, y)
            * Projection::scale(width / src_w as f32, height / src_h as f32);

        let (w, h) = self.image.dimensions();
        let mut layer = RgbaImage::new(w, h);
        warp_into(
            &asset.image,
            &projection,
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
            &mut layer,
        );

        let alpha = self.alpha;
        let dst: &mut [u8] = &mut self.image;
        let src: &[u8] = &layer;
        dst.par_chunks_exact_mut(4)
            .zip(src.par_chunks_exact(4))
            .for_each(|(d, s)| blend_over(d, s, alpha));
    }
}

// source-over with the layer's alpha scaled by the global alpha
#[inline]
fn blend_over(dst: &mut [u8], src: &[u8], global_alpha: f32) {
    let sa = src[3] as f32 / 255.0 * global_alpha;
    if sa <= 0.0 {
        return;
    }

    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    for c in 0..3 {
        let sc = src[c] as f32 / 255.0;
        let dc = dst[c] as f32 / 255.0;
        let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
        dst[c] = clamp(out * 255.0);
    }
    dst[3] = clamp(out_a * 255.0);
}

#[inline]
fn clamp(val: f32) -> u8 {
    if val < 0.0 {
        0
    } else if val > 255.0 {
        255
    } else {
        val.round() as u8
    }
}
