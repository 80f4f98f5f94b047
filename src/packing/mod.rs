mod bin_packer;
mod rect;

pub use bin_packer::{Allocation, BinPacker, RegionId};
pub use rect::{Rect, Size};
