pub mod atlas;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod packing;
pub mod sprite;

#[cfg(test)]
mod testing;

pub use atlas::{PackedEntry, SpriteAtlas, SpritePlacement, SpriteUpdate, SpriteVariant};
pub use cli::{CliArgs, Command, CommonArgs, VariantArg};
pub use error::AtlasError;
pub use loader::{FileTransport, LoadState, SpriteObserver, Transport};
pub use sprite::{SpriteImage, Sprites};
