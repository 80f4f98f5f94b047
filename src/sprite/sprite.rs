use std::collections::BTreeMap;
use std::sync::Arc;

use image::{Rgba, RgbaImage};

/// A named bitmap asset with premultiplied color channels.
///
/// Handed around as `Arc<SpriteImage>`; replacing a sprite in the atlas rebinds
/// the atlas's pointer and never mutates an image someone else still holds.
#[derive(Debug, Clone)]
pub struct SpriteImage {
    /// Premultiplied RGBA pixels
    pub image: RgbaImage,
    /// Device pixels per display pixel of this image
    pub pixel_ratio: f32,
    /// Whether the image is a signed distance field
    pub sdf: bool,
}

impl SpriteImage {
    pub fn new(image: RgbaImage, pixel_ratio: f32) -> Self {
        Self {
            image,
            pixel_ratio,
            sdf: false,
        }
    }

    pub fn sdf(mut self, sdf: bool) -> Self {
        self.sdf = sdf;
        self
    }

    /// Display width (pixels divided by the image's pixel ratio)
    pub fn width(&self) -> f32 {
        self.image.width() as f32 / self.pixel_ratio
    }

    /// Display height (pixels divided by the image's pixel ratio)
    pub fn height(&self) -> f32 {
        self.image.height() as f32 / self.pixel_ratio
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// A sprite needs pixels and a positive ratio to be packed
    pub fn is_valid(&self) -> bool {
        self.image.width() > 0 && self.image.height() > 0 && self.pixel_ratio > 0.0
    }
}

/// Bulk sprite payload, keyed by sprite name
pub type Sprites = BTreeMap<String, Arc<SpriteImage>>;

/// Convert straight alpha to premultiplied alpha in place
pub fn premultiply(image: &mut RgbaImage) {
    for Rgba([r, g, b, a]) in image.pixels_mut() {
        let alpha = u16::from(*a);
        for channel in [r, g, b] {
            *channel = scale_channel(*channel, alpha);
        }
    }
}

/// Convert premultiplied alpha back to straight alpha
pub fn unpremultiply(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for Rgba([r, g, b, a]) in out.pixels_mut() {
        if *a == 0 || *a == u8::MAX {
            continue;
        }
        let alpha = u16::from(*a);
        for channel in [r, g, b] {
            let straight = (u16::from(*channel) * 255 + alpha / 2) / alpha;
            *channel = u8::try_from(straight.min(255)).unwrap_or(u8::MAX);
        }
    }
    out
}

fn scale_channel(value: u8, alpha: u16) -> u8 {
    let scaled = (u16::from(value) * alpha + 127) / 255;
    u8::try_from(scaled).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_size_uses_pixel_ratio() {
        let sprite = SpriteImage::new(RgbaImage::new(16, 12), 2.0);
        assert_eq!(sprite.width(), 8.0);
        assert_eq!(sprite.height(), 6.0);
        assert_eq!(sprite.dimensions(), (16, 12));
    }

    #[test]
    fn test_is_valid() {
        assert!(SpriteImage::new(RgbaImage::new(1, 1), 1.0).is_valid());
        assert!(!SpriteImage::new(RgbaImage::new(0, 4), 1.0).is_valid());
        assert!(!SpriteImage::new(RgbaImage::new(4, 4), 0.0).is_valid());
    }

    #[test]
    fn test_premultiply() {
        let mut image = RgbaImage::from_pixel(1, 1, Rgba([255, 128, 0, 128]));
        premultiply(&mut image);
        assert_eq!(image.get_pixel(0, 0), &Rgba([128, 64, 0, 128]));
    }

    #[test]
    fn test_premultiply_keeps_opaque_and_clears_transparent() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([10, 20, 30, 255]));
        image.put_pixel(1, 0, Rgba([10, 20, 30, 0]));
        premultiply(&mut image);

        assert_eq!(image.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_unpremultiply_restores_straight_alpha() {
        let premultiplied = RgbaImage::from_pixel(1, 1, Rgba([128, 64, 0, 128]));
        let straight = unpremultiply(&premultiplied);
        assert_eq!(straight.get_pixel(0, 0), &Rgba([255, 128, 0, 128]));
    }
}
