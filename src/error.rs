use std::path::PathBuf;
use thiserror::Error;

use crate::loader::ErrorReason;

#[derive(Error, Debug)]
pub enum AtlasError {
    /// A sprite resource could not be fetched
    #[error("{message}")]
    Transport {
        reason: ErrorReason,
        message: String,
    },

    #[error("Failed to parse JSON: {message} at offset {offset}")]
    JsonParse { message: String, offset: usize },

    #[error("Sprite JSON root must be an object")]
    SheetRoot,

    #[error("Unrecognized sprite image format: {0}")]
    UnknownImageFormat(#[source] image::ImageError),

    #[error("Failed to decode sprite image: {0}")]
    ImageDecode(#[source] image::ImageError),

    #[error("Failed to save image '{path}': {source}")]
    ImageSave {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to compress PNG '{path}': {message}")]
    PngCompress { path: PathBuf, message: String },
}
