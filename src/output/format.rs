use std::fs;
use std::io::Cursor;
use std::path::Path;

use anyhow::Result;
use image::{ImageFormat, RgbaImage};

use crate::cli::CompressionLevel;
use crate::error::AtlasError;
use crate::sprite::unpremultiply;

/// Save a composited atlas surface as PNG, optionally with compression.
///
/// The surface holds premultiplied pixels; the file gets straight alpha.
pub fn save_atlas_image(
    image: &RgbaImage,
    path: &Path,
    compress: Option<CompressionLevel>,
) -> Result<()> {
    let mut png_data = Cursor::new(Vec::new());
    unpremultiply(image)
        .write_to(&mut png_data, ImageFormat::Png)
        .map_err(|e| AtlasError::ImageSave {
            path: path.to_path_buf(),
            source: e,
        })?;

    let output_data = if let Some(level) = compress {
        let opts = match level {
            CompressionLevel::Level(n) => oxipng::Options::from_preset(n),
            CompressionLevel::Max => oxipng::Options::max_compression(),
        };
        oxipng::optimize_from_memory(&png_data.into_inner(), &opts).map_err(|e| {
            AtlasError::PngCompress {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?
    } else {
        png_data.into_inner()
    };

    fs::write(path, output_data).map_err(|e| AtlasError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
