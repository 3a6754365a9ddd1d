//! Rectangle arithmetic shared by the damage tracker and sync engine.

use serde::{Deserialize, Serialize};

// ── Rect ─────────────────────────────────────────────────────────

/// An axis-aligned rectangle in framebuffer pixels.
///
/// Coordinates are signed so renderer reports that start off-screen can
/// be represented before clipping. Anything handed to the sync engine has
/// already been clipped and is non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge in pixels.
    pub x: i32,
    /// Top edge in pixels.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering a whole `width × height` frame.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.width as u64 * self.height as u64
        }
    }

    /// Clip to `[0, width) × [0, height)`. Returns `None` if nothing is left.
    pub fn clip(&self, width: u32, height: u32) -> Option<Self> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(width.min(i32::MAX as u32) as i32);
        let y1 = self.bottom().min(height.min(i32::MAX as u32) as i32);
        let clipped = Self::new(x0, y0, x1 - x0, y1 - y0);
        (!clipped.is_empty()).then_some(clipped)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains(&self, other: &Self) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// `true` when pixel `(x, y)` lies inside the rectangle.
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// Bounding box of two rectangles.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// The parts of `self` not covered by `other`, as at most four
    /// non-overlapping bands (top, bottom, left, right).
    pub fn subtract(&self, other: &Self) -> Vec<Rect> {
        if !self.intersects(other) {
            return vec![*self];
        }

        let mut out = Vec::with_capacity(4);
        let top = other.y.max(self.y);
        let bottom = other.bottom().min(self.bottom());

        if self.y < top {
            out.push(Self::new(self.x, self.y, self.width, top - self.y));
        }
        if bottom < self.bottom() {
            out.push(Self::new(self.x, bottom, self.width, self.bottom() - bottom));
        }
        if self.x < other.x {
            out.push(Self::new(self.x, top, other.x - self.x, bottom - top));
        }
        if other.right() < self.right() {
            out.push(Self::new(
                other.right(),
                top,
                self.right() - other.right(),
                bottom - top,
            ));
        }
        out
    }
}

/// Bounding box of every rectangle in `rects`.
pub fn extents<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
    rects
        .into_iter()
        .filter(|r| !r.is_empty())
        .fold(None, |acc: Option<Rect>, r| {
            Some(acc.map_or(*r, |a| a.union(r)))
        })
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_to_bounds() {
        let r = Rect::new(-10, 5, 30, 200);
        assert_eq!(r.clip(100, 100), Some(Rect::new(0, 5, 20, 95)));
        assert_eq!(Rect::new(120, 0, 10, 10).clip(100, 100), None);
        assert_eq!(Rect::new(0, 0, 0, 10).clip(100, 100), None);
    }

    #[test]
    fn contains_point_is_half_open() {
        let r = Rect::new(10, 10, 30, 30);
        assert!(r.contains_point(10, 10));
        assert!(r.contains_point(39, 39));
        assert!(!r.contains_point(40, 39));
        assert!(!r.contains_point(9, 20));
        assert!(!Rect::new(0, 0, 0, 5).contains_point(0, 0));
    }

    #[test]
    fn subtract_leaves_uncovered_bands() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(2, 2, 4, 4);
        let parts = a.subtract(&b);
        let area: u64 = parts.iter().map(Rect::area).sum();
        assert_eq!(area, 100 - 16);
        for p in &parts {
            assert!(!p.intersects(&b));
            assert!(a.contains(p));
        }
        for (i, p) in parts.iter().enumerate() {
            for q in &parts[i + 1..] {
                assert!(!p.intersects(q));
            }
        }
    }

    #[test]
    fn subtract_disjoint_is_identity() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.subtract(&Rect::new(20, 20, 5, 5)), vec![a]);
        assert!(a.subtract(&Rect::new(-5, -5, 30, 30)).is_empty());
    }

    #[test]
    fn extents_of_many() {
        let rects = [Rect::new(5, 5, 1, 1), Rect::new(20, 1, 2, 2)];
        assert_eq!(extents(&rects), Some(Rect::new(5, 1, 17, 5)));
        assert_eq!(extents(&[] as &[Rect]), None);
    }
}
