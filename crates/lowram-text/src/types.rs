//! Basic geometric types shared across the crate.

/// A rectangle in text units, defined by origin and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Empty rectangle at origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a new rectangle from origin and size.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate.
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge y coordinate.
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Check if the rectangle has no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// A rectangle in whole texels on an atlas page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Create a new pixel rectangle.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the rightmost column.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the bottom row.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Check if the rectangle has no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Grow the rectangle by `amount` on every side, saturating at zero.
    pub fn expand(&self, amount: u32) -> Self {
        let x = self.x.saturating_sub(amount);
        let y = self.y.saturating_sub(amount);
        Self {
            x,
            y,
            width: self.right() + amount - x,
            height: self.bottom() + amount - y,
        }
    }

    /// Check if two rectangles share at least one texel.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Horizontal direction in which a string is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

impl TextDirection {
    /// Sign applied to horizontal pen advances.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            TextDirection::LeftToRight => 1.0,
            TextDirection::RightToLeft => -1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_rect_intersection() {
        let a = PixelRect::new(1, 1, 10, 10);
        let b = PixelRect::new(11, 1, 5, 5);
        assert!(!a.intersects(&b));
        assert!(a.expand(1).intersects(&b));
        assert!(!a.intersects(&PixelRect::new(3, 3, 0, 4)));
    }

    #[test]
    fn expand_saturates_at_origin() {
        let r = PixelRect::new(0, 2, 4, 4).expand(1);
        assert_eq!(r, PixelRect::new(0, 1, 5, 6));
    }

    #[test]
    fn direction_sign() {
        assert_eq!(TextDirection::default().sign(), 1.0);
        assert_eq!(TextDirection::RightToLeft.sign(), -1.0);
    }
}
