use std::collections::BTreeSet;

use image::{Rgba, RgbaImage, imageops};
use log::debug;

use super::SpriteVariant;
use crate::packing::{Rect, Size};
use crate::sprite::SpriteImage;

/// Border around every packed sprite, in atlas units and in physical pixels
pub(crate) const BORDER: u32 = 1;

/// The shared pixel surface plus the set of packed entries whose pixels are stale.
///
/// The surface is physical pixels: atlas units scaled by the atlas pixel ratio.
/// It is only allocated when first read.
#[derive(Debug)]
pub(crate) struct Compositor {
    pixel_ratio: f32,
    physical: (u32, u32),
    surface: Option<RgbaImage>,
    dirty: BTreeSet<(String, SpriteVariant)>,
}

impl Compositor {
    pub fn new(size: Size, pixel_ratio: f32) -> Self {
        Self {
            pixel_ratio,
            physical: physical_size(size, pixel_ratio),
            surface: None,
            dirty: BTreeSet::new(),
        }
    }

    pub fn mark_dirty(&mut self, name: &str, variant: SpriteVariant) {
        self.dirty.insert((name.to_string(), variant));
    }

    /// Drop pending redraws for a sprite that no longer exists
    pub fn forget(&mut self, name: &str) {
        self.dirty.retain(|(dirty, _)| dirty != name);
    }

    /// Drop all pending redraws and every drawn pixel
    pub fn reset(&mut self) {
        self.dirty.clear();
        self.surface = None;
    }

    pub fn take_dirty(&mut self) -> BTreeSet<(String, SpriteVariant)> {
        std::mem::take(&mut self.dirty)
    }

    /// Resize for a grown logical size, keeping existing pixels at the top-left
    pub fn resize(&mut self, size: Size) {
        let physical = physical_size(size, self.pixel_ratio);
        if physical == self.physical {
            return;
        }
        debug!(
            "Resizing atlas surface from {}x{} to {}x{}",
            self.physical.0, self.physical.1, physical.0, physical.1
        );
        self.physical = physical;

        if let Some(old) = self.surface.take() {
            let mut grown = RgbaImage::new(physical.0, physical.1);
            imageops::replace(&mut grown, &old, 0, 0);
            self.surface = Some(grown);
        }
    }

    pub fn surface(&mut self) -> &mut RgbaImage {
        let (width, height) = self.physical;
        self.surface
            .get_or_insert_with(|| RgbaImage::new(width, height))
    }

    /// Clear the physical span of a released rectangle, if anything was drawn yet
    pub fn erase(&mut self, rect: Rect) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let ratio = self.pixel_ratio;
        let (surface_w, surface_h) = surface.dimensions();
        let x_end = to_physical(rect.right(), ratio).min(surface_w);
        let y_end = to_physical(rect.bottom(), ratio).min(surface_h);

        for y in to_physical(rect.y, ratio)..y_end {
            for x in to_physical(rect.x, ratio)..x_end {
                surface.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
    }

    /// Copy a sprite into its packed rectangle with a one pixel border.
    ///
    /// Source pixels land 1:1 in the physical surface; the rectangle was sized
    /// by dividing the source by the atlas ratio, so they fit. The rectangle's
    /// physical span is cleared first and writes are clipped to it.
    pub fn draw(&mut self, sprite: &SpriteImage, rect: Rect, variant: SpriteVariant) {
        self.surface();
        self.erase(rect);

        let ratio = self.pixel_ratio;
        let dst_x = i64::from(to_physical(rect.x + BORDER, ratio));
        let dst_y = i64::from(to_physical(rect.y + BORDER, ratio));
        let clip_x = to_physical(rect.x, ratio)..to_physical(rect.right(), ratio);
        let clip_y = to_physical(rect.y, ratio)..to_physical(rect.bottom(), ratio);

        let source = &sprite.image;
        let (src_w, src_h) = (i64::from(source.width()), i64::from(source.height()));
        if src_w == 0 || src_h == 0 {
            return;
        }

        let border = i64::from(BORDER);
        let surface = self.surface();
        let (surface_w, surface_h) = surface.dimensions();

        for dy in -border..src_h + border {
            let Ok(ty) = u32::try_from(dst_y + dy) else {
                continue;
            };
            if !clip_y.contains(&ty) || ty >= surface_h {
                continue;
            }
            let sy = sample(dy, src_h, variant);

            for dx in -border..src_w + border {
                let Ok(tx) = u32::try_from(dst_x + dx) else {
                    continue;
                };
                if !clip_x.contains(&tx) || tx >= surface_w {
                    continue;
                }
                let sx = sample(dx, src_w, variant);
                surface.put_pixel(tx, ty, *source.get_pixel(sx, sy));
            }
        }
    }
}

/// Source coordinate for an offset that may fall one pixel outside the image
fn sample(offset: i64, len: i64, variant: SpriteVariant) -> u32 {
    let index = match variant {
        SpriteVariant::Icon => offset.clamp(0, len - 1),
        SpriteVariant::Pattern => offset.rem_euclid(len),
    };
    u32::try_from(index).unwrap_or(0)
}

/// Atlas units to physical pixels, rounding down
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "atlas coordinates and ratios are positive and far below u32::MAX"
)]
pub(crate) fn to_physical(units: u32, ratio: f32) -> u32 {
    (units as f32 * ratio) as u32
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "atlas sizes and ratios are positive and far below u32::MAX"
)]
fn physical_size(size: Size, ratio: f32) -> (u32, u32) {
    (
        (size.width as f32 * ratio).ceil() as u32,
        (size.height as f32 * ratio).ceil() as u32,
    )
}
