use serde::{Deserialize, Serialize};

/// PNG compression level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompressConfig {
    /// Optimization level 0-6
    Level(u8),
    /// Maximum compression ("max")
    Max(String),
}

/// Sprite atlas configuration file structure.
///
/// All paths in the config are relative to the config file location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Config file version (currently 1)
    pub version: u32,
    /// Sprite sheet base path, without the `.json`/`.png` extension
    pub sprite: Option<String>,
    /// Output directory for atlas files
    pub output_dir: String,
    /// Base name for output files (atlas.png, atlas.json)
    pub name: String,
    /// Initial atlas width in atlas units
    pub width: u32,
    /// Initial atlas height in atlas units
    pub height: u32,
    /// Width the atlas may grow to
    pub max_width: u32,
    /// Height the atlas may grow to
    pub max_height: u32,
    /// Device pixels per atlas unit
    pub pixel_ratio: f32,
    /// Which variants to pack: "icon", "pattern" or "both"
    pub variant: String,
    /// Pack only these sprites (all when empty)
    pub only: Vec<String>,
    /// PNG compression configuration (optional)
    pub compress: Option<CompressConfig>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            version: 1,
            sprite: None,
            output_dir: ".".to_string(),
            name: "atlas".to_string(),
            width: 64,
            height: 64,
            max_width: 4096,
            max_height: 4096,
            pixel_ratio: 1.0,
            variant: "icon".to_string(),
            only: Vec::new(),
            compress: None,
        }
    }
}
