use serde::Serialize;

use crate::packing::Rect;

/// How a sprite is sampled, which decides how its border is filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpriteVariant {
    /// Edge pixels clamped, for single non-repeating draws
    Icon,
    /// Edge pixels wrapped from the opposite side, for tiling
    Pattern,
}

/// Where a sprite variant lives in the atlas and how to sample it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpritePlacement {
    /// Packed rectangle in atlas units, including the 1-unit border
    pub pos: Rect,
    pub sdf: bool,
    /// Sprite pixel ratio divided by the atlas pixel ratio
    pub relative_pixel_ratio: f32,
    /// Display width of the sprite
    pub width: f32,
    /// Display height of the sprite
    pub height: f32,
    /// Normalized top-left texture coordinate
    pub tl: [f32; 2],
    /// Normalized bottom-right texture coordinate
    pub br: [f32; 2],
}

/// A live packed variant of a named sprite
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackedEntry {
    pub name: String,
    pub variant: SpriteVariant,
    pub placement: SpritePlacement,
}

/// Outcome of [`SpriteAtlas::set_sprite`](super::SpriteAtlas::set_sprite)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteUpdate {
    /// New name; packed on first lookup
    Added,
    /// Same dimensions; packed variants will be redrawn
    Replaced,
    /// Dimensions differ from the stored image, which is kept
    Rejected,
    /// The image has no pixels
    Invalid,
}
