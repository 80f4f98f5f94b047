use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;

/// Which half of a sprite sheet a request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    SpriteJson,
    SpriteImage,
}

/// A sprite resource to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub url: String,
}

impl Resource {
    /// Index JSON for the sprite sheet at `base`
    pub fn sprite_json(base: &str, pixel_ratio: f32) -> Self {
        Self {
            kind: ResourceKind::SpriteJson,
            url: format!("{}{}.json", base, ratio_suffix(pixel_ratio)),
        }
    }

    /// Raster image for the sprite sheet at `base`
    pub fn sprite_image(base: &str, pixel_ratio: f32) -> Self {
        Self {
            kind: ResourceKind::SpriteImage,
            url: format!("{}{}.png", base, ratio_suffix(pixel_ratio)),
        }
    }
}

fn ratio_suffix(pixel_ratio: f32) -> &'static str {
    if pixel_ratio > 1.0 { "@2x" } else { "" }
}

/// Why a transport could not deliver a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReason {
    NotFound,
    Server,
    Connection,
    RateLimit,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
    pub reason: ErrorReason,
    pub message: String,
}

impl ResponseError {
    pub fn new(reason: ErrorReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// Payload bytes or the reason there are none
pub type Response = Result<Vec<u8>, ResponseError>;

/// Fetches sprite resources.
///
/// `None` means the request was cancelled or superseded and no outcome will
/// ever arrive. Timeouts and retries belong to the implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, resource: &Resource) -> Option<Response>;
}

/// Serves resources from the local filesystem, treating URLs as paths
#[derive(Debug, Clone, Default)]
pub struct FileTransport {
    root: Option<PathBuf>,
}

impl FileTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative URLs against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let url = url.strip_prefix("file://").unwrap_or(url);
        match &self.root {
            Some(root) => root.join(url),
            None => PathBuf::from(url),
        }
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn request(&self, resource: &Resource) -> Option<Response> {
        let path = self.path_for(&resource.url);
        debug!("Reading {}", path.display());

        let response = tokio::fs::read(&path).await.map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::NotFound => ErrorReason::NotFound,
                _ => ErrorReason::Other,
            };
            ResponseError::new(reason, format!("{}: {}", path.display(), e))
        });

        Some(response)
    }
}
