mod parser;
mod sprite;

pub use parser::parse_sprite_sheet;
pub use sprite::{SpriteImage, Sprites, premultiply, unpremultiply};
