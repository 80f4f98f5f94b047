use log::{debug, info};

use super::{Resource, Response, Transport};
use crate::atlas::SpriteAtlas;
use crate::error::AtlasError;
use crate::sprite::{Sprites, parse_sprite_sheet};

/// Where the most recent [`SpriteAtlas::load`] stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed,
    /// The transport dropped a request; this attempt will never finish
    Canceled,
}

/// Receives the outcome of a sprite sheet load.
///
/// Each completed load calls exactly one method; a cancelled load calls none.
pub trait SpriteObserver {
    fn on_sprites_loaded(&mut self) {}

    fn on_sprites_error(&mut self, _error: &AtlasError) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SpriteObserver for NullObserver {}

impl SpriteAtlas {
    pub fn set_observer(&mut self, observer: Box<dyn SpriteObserver + Send>) {
        self.observer = observer;
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    /// Fetch and install the sprite sheet at `url`.
    ///
    /// Both halves are requested together and the outcome is decided only once
    /// both have answered, whatever order they arrive in. On failure the current
    /// sprites are left untouched. An empty `url` installs an empty sprite set.
    pub async fn load<T>(&mut self, url: &str, transport: &T)
    where
        T: Transport + ?Sized,
    {
        if url.is_empty() {
            self.finish(Ok(Sprites::new()));
            return;
        }

        self.load_state = LoadState::Loading;
        let json_resource = Resource::sprite_json(url, self.pixel_ratio());
        let image_resource = Resource::sprite_image(url, self.pixel_ratio());
        debug!("Loading sprites from {} and {}", json_resource.url, image_resource.url);

        let (json, image) = futures::join!(
            transport.request(&json_resource),
            transport.request(&image_resource)
        );

        let (Some(json), Some(image)) = (json, image) else {
            debug!("Sprite request for {} was canceled", url);
            self.load_state = LoadState::Canceled;
            return;
        };

        self.finish(parse_responses(json, image));
    }

    fn finish(&mut self, result: Result<Sprites, AtlasError>) {
        match result {
            Ok(sprites) => {
                info!("Loaded {} sprites", sprites.len());
                self.set_sprites(sprites);
                self.load_state = LoadState::Loaded;
                self.observer.on_sprites_loaded();
            }
            Err(e) => {
                self.load_state = LoadState::Failed;
                self.observer.on_sprites_error(&e);
            }
        }
    }
}

fn parse_responses(json: Response, image: Response) -> Result<Sprites, AtlasError> {
    let json = json.map_err(transport_error)?;
    let image = image.map_err(transport_error)?;
    parse_sprite_sheet(&image, &json)
}

fn transport_error(error: super::ResponseError) -> AtlasError {
    AtlasError::Transport {
        reason: error.reason,
        message: error.message,
    }
}
