use super::{Rect, Size};

/// Handle to a region in the packer's arena.
///
/// The generation guards against a stale handle addressing a slot that was
/// later reused for another region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId {
    index: usize,
    generation: u32,
}

/// An occupied rectangle handed out by [`BinPacker::allocate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub id: RegionId,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy)]
struct Region {
    rect: Rect,
    free: bool,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    region: Option<Region>,
}

/// Guillotine bin packer over a growable surface.
///
/// Free and occupied regions are records in an arena indexed by [`RegionId`];
/// together they partition the surface.
#[derive(Debug)]
pub struct BinPacker {
    width: u32,
    height: u32,
    slots: Vec<Slot>,
    vacant: Vec<usize>,
    /// Last released rectangle, reused by the next allocation that fits in it
    released: Option<Rect>,
}

impl BinPacker {
    pub fn new(width: u32, height: u32) -> Self {
        let mut packer = Self {
            width,
            height,
            slots: Vec::new(),
            vacant: Vec::new(),
            released: None,
        };
        packer.insert(Region {
            rect: Rect::new(0, 0, width, height),
            free: true,
        });
        packer
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Allocate a `width`x`height` rectangle in the smallest free region that fits.
    ///
    /// Ties between equally sized regions go to the topmost, then leftmost one,
    /// so the same call sequence always yields the same placements. A request
    /// that fits in the rectangle released just before is placed back there.
    pub fn allocate(&mut self, width: u32, height: u32) -> Option<Allocation> {
        if width == 0 || height == 0 {
            return None;
        }

        let (index, free, placed) = match self.find_released(width, height) {
            Some(found) => found,
            None => {
                let (index, free) = self.find_free(width, height)?;
                (index, free, Rect::new(free.x, free.y, width, height))
            }
        };
        self.released = None;

        let slot = &mut self.slots[index];
        slot.region = Some(Region {
            rect: placed,
            free: false,
        });
        let id = RegionId {
            index,
            generation: slot.generation,
        };

        for rect in split(free, placed) {
            if !rect.is_empty() {
                self.insert(Region { rect, free: true });
            }
        }

        Some(Allocation { id, rect: placed })
    }

    /// Return an allocated region to the free pool.
    ///
    /// Pixels are not touched. Returns `false` for stale or already released handles.
    pub fn release(&mut self, id: RegionId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index) else {
            return false;
        };
        if slot.generation != id.generation {
            return false;
        }
        match slot.region.as_mut() {
            Some(region) if !region.free => region.free = true,
            _ => return false,
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.released = slot.region.map(|region| region.rect);

        self.coalesce(id.index);
        true
    }

    /// Grow the surface; the added area becomes free space. Never shrinks.
    pub fn grow(&mut self, width: u32, height: u32) {
        let width = width.max(self.width);
        let height = height.max(self.height);
        let right = Rect::new(self.width, 0, width - self.width, height);
        let bottom = Rect::new(0, self.height, self.width, height - self.height);
        self.width = width;
        self.height = height;

        for rect in [right, bottom] {
            if !rect.is_empty() {
                let index = self.insert(Region { rect, free: true });
                self.coalesce(index);
            }
        }
    }

    /// Drop every region, leaving the whole surface free.
    pub fn clear(&mut self) {
        self.released = None;
        self.vacant.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.region.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.vacant.push(index);
        }
        self.insert(Region {
            rect: Rect::new(0, 0, self.width, self.height),
            free: true,
        });
    }

    /// Fraction of the surface covered by allocations (0.0 to 1.0)
    pub fn occupancy(&self) -> f64 {
        let total = Size::new(self.width, self.height).area();
        if total == 0 {
            return 0.0;
        }
        let used: u64 = self
            .regions()
            .filter(|region| !region.free)
            .map(|region| region.rect.area())
            .sum();
        used as f64 / total as f64
    }

    pub fn free_rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.regions()
            .filter(|region| region.free)
            .map(|region| region.rect)
    }

    fn regions(&self) -> impl Iterator<Item = &Region> {
        self.slots.iter().filter_map(|slot| slot.region.as_ref())
    }

    fn find_free(&self, width: u32, height: u32) -> Option<(usize, Rect)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot.region {
                Some(Region { rect, free: true }) if rect.width >= width && rect.height >= height => {
                    Some((index, rect))
                }
                _ => None,
            })
            .min_by_key(|(_, rect)| (rect.area(), rect.y, rect.x))
    }

    /// The free region holding the last released rectangle, if the request fits there
    fn find_released(&self, width: u32, height: u32) -> Option<(usize, Rect, Rect)> {
        let released = self.released?;
        if width > released.width || height > released.height {
            return None;
        }

        self.slots
            .iter()
            .enumerate()
            .find_map(|(index, slot)| match slot.region {
                Some(Region { rect, free: true }) if rect.contains(&released) => Some((
                    index,
                    rect,
                    Rect::new(released.x, released.y, width, height),
                )),
                _ => None,
            })
    }

    fn insert(&mut self, region: Region) -> usize {
        match self.vacant.pop() {
            Some(index) => {
                self.slots[index].region = Some(region);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    region: Some(region),
                });
                self.slots.len() - 1
            }
        }
    }

    fn vacate(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.region = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(index);
    }

    /// Merge the free region at `index` with free neighbours until none share an edge.
    fn coalesce(&mut self, index: usize) {
        loop {
            let Some(current) = self.slots[index].region.map(|region| region.rect) else {
                return;
            };

            let neighbour = self.slots.iter().enumerate().find_map(|(other, slot)| {
                match slot.region {
                    Some(Region { rect, free: true }) if other != index => {
                        current.merge(&rect).map(|merged| (other, merged))
                    }
                    _ => None,
                }
            });

            let Some((other, merged)) = neighbour else {
                return;
            };
            self.slots[index].region = Some(Region {
                rect: merged,
                free: true,
            });
            self.vacate(other);
        }
    }
}

/// Free pieces left when `placed` is cut out of `free`.
///
/// Strips left of and above `placed` come off first. The remainder, with
/// `placed` at its top-left, is split along its shorter leftover axis so the
/// larger piece stays whole.
fn split(free: Rect, placed: Rect) -> [Rect; 4] {
    let left = Rect::new(free.x, free.y, placed.x - free.x, free.height);
    let top = Rect::new(placed.x, free.y, free.right() - placed.x, placed.y - free.y);
    let rest = Rect::new(
        placed.x,
        placed.y,
        free.right() - placed.x,
        free.bottom() - placed.y,
    );

    let leftover_w = rest.width - placed.width;
    let leftover_h = rest.height - placed.height;
    let (right, bottom) = if leftover_w < leftover_h {
        (
            Rect::new(placed.right(), rest.y, leftover_w, placed.height),
            Rect::new(rest.x, placed.bottom(), rest.width, leftover_h),
        )
    } else {
        (
            Rect::new(placed.right(), rest.y, leftover_w, rest.height),
            Rect::new(rest.x, placed.bottom(), placed.width, leftover_h),
        )
    };

    [left, top, right, bottom]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_allocate() {
        let mut packer = BinPacker::new(100, 100);
        let allocation = packer.allocate(50, 40).unwrap();

        assert_eq!(allocation.rect, Rect::new(0, 0, 50, 40));
    }

    #[test]
    fn test_zero_sized_request() {
        let mut packer = BinPacker::new(100, 100);
        assert!(packer.allocate(0, 10).is_none());
        assert!(packer.allocate(10, 0).is_none());
    }

    #[test]
    fn test_too_large() {
        let mut packer = BinPacker::new(100, 100);
        assert!(packer.allocate(150, 50).is_none());
        assert!(packer.allocate(100, 101).is_none());
    }

    #[test]
    fn test_best_fit_prefers_smallest_region() {
        // Same layout as an icon followed by a pattern of one 18px sprite
        let mut packer = BinPacker::new(63, 112);
        let icon = packer.allocate(20, 20).unwrap();
        let pattern = packer.allocate(20, 20).unwrap();

        assert_eq!(icon.rect, Rect::new(0, 0, 20, 20));
        assert_eq!(pattern.rect, Rect::new(20, 0, 20, 20));
    }

    #[test]
    fn test_allocations_never_overlap() {
        let mut packer = BinPacker::new(128, 128);
        let sizes = [
            (20, 20),
            (36, 12),
            (8, 40),
            (16, 16),
            (24, 28),
            (12, 12),
            (40, 8),
            (20, 16),
            (32, 32),
            (4, 4),
        ];

        let placed: Vec<Rect> = sizes
            .iter()
            .filter_map(|&(w, h)| packer.allocate(w, h))
            .map(|allocation| allocation.rect)
            .collect();

        assert_eq!(placed.len(), sizes.len());
        let bounds = Rect::new(0, 0, 128, 128);
        for (i, a) in placed.iter().enumerate() {
            assert!(bounds.contains(a));
            for b in &placed[i + 1..] {
                assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_release_then_allocate_reuses_rect() {
        let mut packer = BinPacker::new(100, 100);
        let first = packer.allocate(10, 10).unwrap();
        let second = packer.allocate(10, 10).unwrap();
        assert_eq!(second.rect, Rect::new(0, 10, 10, 10));

        assert!(packer.release(first.id));
        let again = packer.allocate(10, 10).unwrap();

        assert_eq!(again.rect, first.rect);
    }

    #[test]
    fn test_reuse_after_release_merges_into_larger_region() {
        let mut packer = BinPacker::new(100, 100);
        let a = packer.allocate(10, 10).unwrap();
        let b = packer.allocate(90, 90).unwrap();
        assert_eq!(b.rect, Rect::new(10, 0, 90, 90));

        // `a` merges with the 10x90 strip below it, which is larger than the
        // 90x10 strip under `b`
        assert!(packer.release(a.id));
        assert!(packer.free_rects().any(|rect| rect == Rect::new(0, 0, 10, 100)));

        let again = packer.allocate(10, 10).unwrap();
        assert_eq!(again.rect, a.rect);
        assert!(!again.rect.intersects(&b.rect));
    }

    #[test]
    fn test_reuse_applies_only_to_next_allocation() {
        let mut packer = BinPacker::new(100, 100);
        let a = packer.allocate(10, 10).unwrap();
        packer.allocate(90, 90).unwrap();
        packer.release(a.id);

        // Too big for the released rect: normal best fit, and the hint is dropped
        let wide = packer.allocate(20, 10).unwrap();
        assert_eq!(wide.rect, Rect::new(10, 90, 20, 10));
        let small = packer.allocate(10, 10).unwrap();
        assert_eq!(small.rect, Rect::new(30, 90, 10, 10));
    }

    #[test]
    fn test_reuse_carves_middle_of_free_region() {
        let mut packer = BinPacker::new(30, 10);
        let a = packer.allocate(10, 10).unwrap();
        let b = packer.allocate(10, 10).unwrap();
        let c = packer.allocate(10, 10).unwrap();
        assert_eq!(b.rect, Rect::new(10, 0, 10, 10));

        packer.release(a.id);
        packer.release(c.id);
        packer.release(b.id);
        assert_eq!(packer.free_rects().collect::<Vec<_>>().len(), 1);

        let again = packer.allocate(8, 8).unwrap();
        assert_eq!(again.rect, Rect::new(10, 0, 8, 8));

        let mut free: Vec<Rect> = packer.free_rects().collect();
        free.sort_by_key(|rect| (rect.y, rect.x));
        assert_eq!(
            free,
            vec![
                Rect::new(0, 0, 10, 10),
                Rect::new(18, 0, 12, 10),
                Rect::new(10, 8, 8, 2),
            ]
        );
        assert!((packer.occupancy() - 64.0 / 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_release_merges_neighbours() {
        let mut packer = BinPacker::new(36, 36);
        let left = packer.allocate(18, 36).unwrap();
        let right = packer.allocate(18, 36).unwrap();
        assert!(packer.allocate(1, 1).is_none());

        assert!(packer.release(left.id));
        assert!(packer.release(right.id));

        assert_eq!(packer.free_rects().count(), 1);
        let whole = packer.allocate(36, 36).unwrap();
        assert_eq!(whole.rect, Rect::new(0, 0, 36, 36));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut packer = BinPacker::new(64, 64);
        let a = packer.allocate(16, 16).unwrap();
        let b = packer.allocate(16, 16).unwrap();

        assert!(packer.release(a.id));
        assert!(!packer.release(a.id));

        // `c` lands in the slot `a` used; the stale handle must not free it
        let c = packer.allocate(16, 16).unwrap();
        assert_eq!(c.rect, a.rect);
        assert!(!packer.release(a.id));
        assert!(packer.release(c.id));
        assert!(packer.release(b.id));
    }

    #[test]
    fn test_stale_handle_after_clear() {
        let mut packer = BinPacker::new(32, 32);
        let a = packer.allocate(32, 32).unwrap();
        packer.clear();
        let b = packer.allocate(32, 32).unwrap();

        assert!(!packer.release(a.id));
        assert!(packer.release(b.id));
    }

    #[test]
    fn test_grow_adds_free_space() {
        let mut packer = BinPacker::new(32, 32);
        let small = packer.allocate(20, 20).unwrap();
        assert!(packer.allocate(32, 32).is_none());

        packer.grow(64, 32);
        assert_eq!(packer.size(), Size::new(64, 32));

        // The new strip merges with the free column right of `small`
        let big = packer.allocate(32, 32).unwrap();
        assert_eq!(big.rect, Rect::new(20, 0, 32, 32));
        assert!(!big.rect.intersects(&small.rect));
    }

    #[test]
    fn test_grow_merges_with_untouched_space() {
        let mut packer = BinPacker::new(32, 32);
        packer.grow(64, 32);

        assert_eq!(packer.free_rects().collect::<Vec<_>>(), vec![Rect::new(0, 0, 64, 32)]);
    }

    #[test]
    fn test_grow_never_shrinks() {
        let mut packer = BinPacker::new(32, 32);
        packer.grow(16, 48);
        assert_eq!(packer.size(), Size::new(32, 48));
    }

    #[test]
    fn test_clear_frees_everything() {
        let mut packer = BinPacker::new(40, 40);
        packer.allocate(20, 20).unwrap();
        packer.allocate(20, 20).unwrap();
        packer.clear();

        assert_eq!(packer.occupancy(), 0.0);
        assert_eq!(packer.allocate(40, 40).unwrap().rect, Rect::new(0, 0, 40, 40));
    }

    #[test]
    fn test_deterministic_assignment() {
        let run = || {
            let mut packer = BinPacker::new(64, 64);
            let a = packer.allocate(20, 12).unwrap();
            let b = packer.allocate(8, 28).unwrap();
            packer.release(a.id);
            let c = packer.allocate(16, 16).unwrap();
            let d = packer.allocate(20, 20).unwrap();
            [b.rect, c.rect, d.rect]
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_occupancy_full() {
        let mut packer = BinPacker::new(100, 100);
        for _ in 0..4 {
            packer.allocate(50, 50).unwrap();
        }

        assert!((packer.occupancy() - 1.0).abs() < f64::EPSILON);
    }
}
