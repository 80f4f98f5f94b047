use serde::{Deserialize, Serialize};

/// A rectangle in atlas units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Check if this rectangle intersects with another
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Check if this rectangle fully contains another
    pub fn contains(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Union of two rectangles sharing a full edge, if they do
    pub fn merge(&self, other: &Rect) -> Option<Rect> {
        if self.y == other.y && self.height == other.height {
            if self.right() == other.x {
                return Some(Rect::new(self.x, self.y, self.width + other.width, self.height));
            }
            if other.right() == self.x {
                return Some(Rect::new(other.x, self.y, self.width + other.width, self.height));
            }
        }
        if self.x == other.x && self.width == other.width {
            if self.bottom() == other.y {
                return Some(Rect::new(self.x, self.y, self.width, self.height + other.height));
            }
            if other.bottom() == self.y {
                return Some(Rect::new(self.x, other.y, self.width, self.height + other.height));
            }
        }
        None
    }
}

/// Width and height in atlas units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}
