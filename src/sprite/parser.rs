use std::sync::Arc;

use image::{ImageReader, RgbaImage};
use log::{error, warn};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;

use super::{SpriteImage, Sprites, premultiply};
use crate::error::AtlasError;

/// Largest sprite edge accepted from a sheet, in pixels
const MAX_SPRITE_EDGE: u16 = 1024;

/// Largest accepted sprite pixel ratio
const MAX_PIXEL_RATIO: f64 = 10.0;

/// Placement of one sprite inside the sheet raster
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpriteMetrics {
    x: u16,
    y: u16,
    width: u16,
    height: u16,
    #[serde(default = "default_pixel_ratio")]
    pixel_ratio: f64,
    #[serde(default)]
    sdf: bool,
}

fn default_pixel_ratio() -> f64 {
    1.0
}

/// Parse a sprite sheet (PNG raster plus JSON index) into premultiplied sprites.
///
/// The image is decoded first, so a sheet with both parts broken reports the
/// image error. Entries with malformed or out-of-bounds metrics are skipped.
pub fn parse_sprite_sheet(image: &[u8], json: &[u8]) -> Result<Sprites, AtlasError> {
    let raster = decode_raster(image)?;
    let index = parse_index(json)?;

    let Value::Object(entries) = index else {
        return Err(AtlasError::SheetRoot);
    };

    let metrics: Vec<(String, SpriteMetrics)> = entries
        .into_iter()
        .filter(|(_, value)| value.is_object())
        .filter_map(|(name, value)| match serde_json::from_value(value) {
            Ok(metrics) => Some((name, metrics)),
            Err(e) => {
                warn!("Invalid metrics for sprite '{}': {}", name, e);
                None
            }
        })
        .collect();

    let sprites = metrics
        .into_par_iter()
        .filter_map(|(name, metrics)| {
            let sprite = crop_sprite(&raster, &metrics)?;
            Some((name, Arc::new(sprite)))
        })
        .collect();

    Ok(sprites)
}

fn decode_raster(bytes: &[u8]) -> Result<RgbaImage, AtlasError> {
    let format = image::guess_format(bytes).map_err(AtlasError::UnknownImageFormat)?;

    let mut raster = ImageReader::with_format(std::io::Cursor::new(bytes), format)
        .decode()
        .map_err(AtlasError::ImageDecode)?
        .into_rgba8();
    premultiply(&mut raster);

    Ok(raster)
}

fn parse_index(json: &[u8]) -> Result<Value, AtlasError> {
    serde_json::from_slice(json).map_err(|e| {
        // serde_json appends "at line L column C"; report a byte offset instead
        let full = e.to_string();
        let suffix = format!(" at line {} column {}", e.line(), e.column());
        let message = full.strip_suffix(&suffix).unwrap_or(&full).to_string();
        AtlasError::JsonParse {
            message,
            offset: byte_offset(json, e.line(), e.column()),
        }
    })
}

/// Byte offset of a one-based line/column position
fn byte_offset(bytes: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = bytes
        .split_inclusive(|&b| b == b'\n')
        .take(line.saturating_sub(1))
        .map(<[u8]>::len)
        .sum();
    line_start + column.saturating_sub(1)
}

fn crop_sprite(raster: &RgbaImage, metrics: &SpriteMetrics) -> Option<SpriteImage> {
    let (raster_w, raster_h) = raster.dimensions();
    let x = u32::from(metrics.x);
    let y = u32::from(metrics.y);
    let width = u32::from(metrics.width);
    let height = u32::from(metrics.height);

    let valid = metrics.width > 0
        && metrics.height > 0
        && metrics.width <= MAX_SPRITE_EDGE
        && metrics.height <= MAX_SPRITE_EDGE
        && metrics.pixel_ratio > 0.0
        && metrics.pixel_ratio <= MAX_PIXEL_RATIO
        && x + width <= raster_w
        && y + height <= raster_h;

    if !valid {
        error!("Can't create sprite with invalid metrics");
        return None;
    }

    let image = image::imageops::crop_imm(raster, x, y, width, height).to_image();

    #[expect(
        clippy::cast_possible_truncation,
        reason = "pixel ratio is bounded to (0, 10]"
    )]
    let pixel_ratio = metrics.pixel_ratio as f32;

    Some(SpriteImage::new(image, pixel_ratio).sdf(metrics.sdf))
}
