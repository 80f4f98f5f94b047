use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;
use log::{debug, info, warn};

use super::compositor::{BORDER, Compositor};
use super::{PackedEntry, SpritePlacement, SpriteUpdate, SpriteVariant};
use crate::loader::{LoadState, NullObserver, SpriteObserver};
use crate::packing::{Allocation, BinPacker, Rect, Size};
use crate::sprite::{SpriteImage, Sprites};

/// Default upper bound on atlas growth, in atlas units
pub const DEFAULT_MAX_SIZE: u32 = 4096;

const VARIANTS: [SpriteVariant; 2] = [SpriteVariant::Icon, SpriteVariant::Pattern];

/// A stored sprite and the regions its variants occupy, if packed
#[derive(Debug)]
struct Entry {
    image: Arc<SpriteImage>,
    icon: Option<Allocation>,
    pattern: Option<Allocation>,
}

impl Entry {
    fn new(image: Arc<SpriteImage>) -> Self {
        Self {
            image,
            icon: None,
            pattern: None,
        }
    }

    fn slot(&self, variant: SpriteVariant) -> Option<Allocation> {
        match variant {
            SpriteVariant::Icon => self.icon,
            SpriteVariant::Pattern => self.pattern,
        }
    }

    fn slot_mut(&mut self, variant: SpriteVariant) -> &mut Option<Allocation> {
        match variant {
            SpriteVariant::Icon => &mut self.icon,
            SpriteVariant::Pattern => &mut self.pattern,
        }
    }
}

/// Dynamic texture atlas for named sprites.
///
/// Sprites are stored on [`set_sprite`](Self::set_sprite) but only packed when
/// first looked up as an icon or pattern. Pixels are composited into the shared
/// surface lazily by [`atlas_image`](Self::atlas_image).
///
/// Not internally synchronized: keep an atlas on one thread, or behind a lock.
pub struct SpriteAtlas {
    size: Size,
    max_size: Size,
    pixel_ratio: f32,
    bin: BinPacker,
    entries: HashMap<String, Entry>,
    compositor: Compositor,
    loaded: bool,
    pub(crate) load_state: LoadState,
    pub(crate) observer: Box<dyn SpriteObserver + Send>,
}

impl SpriteAtlas {
    /// Create an atlas of `size` atlas units at `pixel_ratio` device pixels per unit
    pub fn new(size: Size, pixel_ratio: f32) -> Self {
        Self {
            size,
            max_size: Size::new(
                DEFAULT_MAX_SIZE.max(size.width),
                DEFAULT_MAX_SIZE.max(size.height),
            ),
            pixel_ratio,
            bin: BinPacker::new(size.width, size.height),
            entries: HashMap::new(),
            compositor: Compositor::new(size, pixel_ratio),
            loaded: false,
            load_state: LoadState::Idle,
            observer: Box::new(NullObserver),
        }
    }

    /// Limit how far the atlas may grow. Never below the current size.
    pub fn max_size(mut self, max_size: Size) -> Self {
        self.max_size = Size::new(
            max_size.width.max(self.size.width),
            max_size.height.max(self.size.height),
        );
        self
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Current size in atlas units; grows when packing runs out of room
    pub fn size(&self) -> Size {
        self.size
    }

    /// Whether a full sprite set has been installed
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Fraction of the atlas covered by packed sprites
    pub fn occupancy(&self) -> f64 {
        self.bin.occupancy()
    }

    /// Replace the whole sprite set. Every packed region is released.
    pub fn set_sprites(&mut self, sprites: Sprites) {
        self.bin.clear();
        self.compositor.reset();
        self.entries.clear();

        for (name, sprite) in sprites {
            if !sprite.is_valid() {
                warn!("invalid sprite image '{}'", name);
                continue;
            }
            self.entries.insert(name, Entry::new(sprite));
        }

        self.loaded = true;
        debug!("Installed {} sprites", self.entries.len());
    }

    /// Add a sprite or replace one with the same pixel dimensions.
    ///
    /// A replacement with different dimensions is rejected and the stored image kept.
    pub fn set_sprite(&mut self, name: &str, sprite: Arc<SpriteImage>) -> SpriteUpdate {
        if !sprite.is_valid() {
            warn!("invalid sprite image '{}'", name);
            return SpriteUpdate::Invalid;
        }

        match self.entries.get_mut(name) {
            None => {
                self.entries.insert(name.to_string(), Entry::new(sprite));
                SpriteUpdate::Added
            }
            Some(entry) => {
                if entry.image.dimensions() != sprite.dimensions() {
                    warn!("Can't change sprite dimensions for '{}'", name);
                    return SpriteUpdate::Rejected;
                }

                entry.image = sprite;
                for variant in VARIANTS {
                    if entry.slot(variant).is_some() {
                        self.compositor.mark_dirty(name, variant);
                    }
                }
                SpriteUpdate::Replaced
            }
        }
    }

    /// Drop a sprite, free its packed regions and clear their pixels.
    /// Removing an absent name does nothing.
    pub fn remove_sprite(&mut self, name: &str) -> bool {
        let Some(entry) = self.entries.remove(name) else {
            return false;
        };

        for allocation in [entry.icon, entry.pattern].into_iter().flatten() {
            self.bin.release(allocation.id);
            self.compositor.erase(allocation.rect);
        }
        self.compositor.forget(name);
        true
    }

    /// The stored image for `name`, shared with the atlas
    pub fn get_sprite(&self, name: &str) -> Option<Arc<SpriteImage>> {
        match self.entries.get(name) {
            Some(entry) => Some(Arc::clone(&entry.image)),
            None => {
                info!("Can't find sprite named '{}'", name);
                None
            }
        }
    }

    /// Placement of `name` with clamped edges, packing it on first use
    pub fn get_icon(&mut self, name: &str) -> Option<SpritePlacement> {
        self.get_image(name, SpriteVariant::Icon)
    }

    /// Placement of `name` with wrapped edges, packing it on first use
    pub fn get_pattern(&mut self, name: &str) -> Option<SpritePlacement> {
        self.get_image(name, SpriteVariant::Pattern)
    }

    /// The composited surface, with every stale region redrawn first
    pub fn atlas_image(&mut self) -> &RgbaImage {
        for (name, variant) in self.compositor.take_dirty() {
            let Some(entry) = self.entries.get(&name) else {
                continue;
            };
            let Some(allocation) = entry.slot(variant) else {
                continue;
            };
            self.compositor
                .draw(&entry.image, allocation.rect, variant);
        }

        self.compositor.surface()
    }

    /// Names of every stored sprite, sorted
    pub fn sprite_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Every packed variant, sorted by name then variant
    pub fn packed(&self) -> Vec<PackedEntry> {
        let mut packed: Vec<PackedEntry> = self
            .entries
            .iter()
            .flat_map(|(name, entry)| {
                VARIANTS.into_iter().filter_map(move |variant| {
                    entry.slot(variant).map(|allocation| PackedEntry {
                        name: name.clone(),
                        variant,
                        placement: self.placement(allocation.rect, &entry.image),
                    })
                })
            })
            .collect();
        packed.sort_by(|a, b| (&a.name, a.variant).cmp(&(&b.name, b.variant)));
        packed
    }

    fn get_image(&mut self, name: &str, variant: SpriteVariant) -> Option<SpritePlacement> {
        let Some(entry) = self.entries.get(name) else {
            info!("Can't find sprite named '{}'", name);
            return None;
        };

        if let Some(allocation) = entry.slot(variant) {
            return Some(self.placement(allocation.rect, &entry.image));
        }

        let sprite = Arc::clone(&entry.image);
        let (width, height) = self.pack_size(&sprite);
        let allocation = self.allocate(width, height)?;

        if let Some(entry) = self.entries.get_mut(name) {
            *entry.slot_mut(variant) = Some(allocation);
        }
        self.compositor.mark_dirty(name, variant);
        debug!(
            "Packed {:?} '{}' at {}x{}+{}+{}",
            variant,
            name,
            allocation.rect.width,
            allocation.rect.height,
            allocation.rect.x,
            allocation.rect.y
        );

        Some(self.placement(allocation.rect, &sprite))
    }

    /// Allocate a region, growing the atlas once if it is full
    fn allocate(&mut self, width: u32, height: u32) -> Option<Allocation> {
        if let Some(allocation) = self.bin.allocate(width, height) {
            return Some(allocation);
        }

        let target = grow_target(self.size, width, height, self.max_size);
        if target != self.size {
            debug!(
                "Growing sprite atlas from {}x{} to {}x{}",
                self.size.width, self.size.height, target.width, target.height
            );
            self.bin.grow(target.width, target.height);
            self.compositor.resize(target);
            self.size = target;

            if let Some(allocation) = self.bin.allocate(width, height) {
                return Some(allocation);
            }
        }

        warn!("sprite atlas bitmap overflow");
        None
    }

    /// Packed size in atlas units for a sprite's pixels
    fn pack_size(&self, sprite: &SpriteImage) -> (u32, u32) {
        let (width, height) = sprite.dimensions();
        (
            pack_extent(width, self.pixel_ratio),
            pack_extent(height, self.pixel_ratio),
        )
    }

    fn placement(&self, rect: Rect, sprite: &SpriteImage) -> SpritePlacement {
        let relative_pixel_ratio = sprite.pixel_ratio / self.pixel_ratio;
        let (width, height) = (sprite.width(), sprite.height());
        let atlas_w = self.size.width as f32;
        let atlas_h = self.size.height as f32;
        let x = (rect.x + BORDER) as f32;
        let y = (rect.y + BORDER) as f32;

        SpritePlacement {
            pos: rect,
            sdf: sprite.sdf,
            relative_pixel_ratio,
            width,
            height,
            tl: [x / atlas_w, y / atlas_h],
            br: [
                (x + width * relative_pixel_ratio) / atlas_w,
                (y + height * relative_pixel_ratio) / atlas_h,
            ],
        }
    }
}

/// Units needed for `pixels` at `ratio`, plus a border on both sides, rounded
/// up to a multiple of 4
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "sprite sizes and ratios are positive and far below u32::MAX"
)]
fn pack_extent(pixels: u32, ratio: f32) -> u32 {
    let units = (pixels as f32 / ratio).ceil() as u32;
    (units + 2 * BORDER).next_multiple_of(4)
}

/// Size to grow to when a `width`x`height` request does not fit.
///
/// A dimension the request exceeds grows by the request; otherwise the shorter
/// side doubles (width on ties). Either way one retry is guaranteed a strip
/// large enough, unless `max` clamps it.
fn grow_target(current: Size, width: u32, height: u32, max: Size) -> Size {
    let mut target = current;
    if width > current.width || height > current.height {
        if width > current.width {
            target.width = current.width.saturating_add(width);
        }
        if height > current.height {
            target.height = current.height.saturating_add(height);
        }
    } else if current.width <= current.height {
        target.width = current.width.saturating_mul(2);
    } else {
        target.height = current.height.saturating_mul(2);
    }

    Size::new(target.width.min(max.width), target.height.min(max.height))
}
