mod atlas;
mod compositor;
mod types;

pub use atlas::{DEFAULT_MAX_SIZE, SpriteAtlas};
pub use types::{PackedEntry, SpritePlacement, SpriteUpdate, SpriteVariant};
