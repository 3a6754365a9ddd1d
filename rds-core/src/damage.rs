//! Accumulated renderer damage between two flushes.
//!
//! The tracker keeps a list of non-overlapping rectangles clipped to the
//! current frame bounds, plus a full-frame flag that overrides the list.

use tracing::trace;

use crate::geometry::{Rect, extents};

/// Tracked rectangle count above which the list collapses to its
/// bounding box.
pub const DEFAULT_MAX_TRACKED: usize = 256;

// ── DirtyTracker ─────────────────────────────────────────────────

/// Dirty region of the framebuffer since the last [`drain`](Self::drain).
#[derive(Debug, Clone)]
pub struct DirtyTracker {
    width: u32,
    height: u32,
    rects: Vec<Rect>,
    full: bool,
    max_tracked: usize,
}

impl DirtyTracker {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_max_tracked(width, height, DEFAULT_MAX_TRACKED)
    }

    pub fn with_max_tracked(width: u32, height: u32, max_tracked: usize) -> Self {
        Self {
            width,
            height,
            rects: Vec::new(),
            full: false,
            max_tracked: max_tracked.max(1),
        }
    }

    /// Current frame bounds.
    pub fn bounds(&self) -> Rect {
        Rect::full(self.width, self.height)
    }

    /// Change the clipping bounds after a resize. Pending rectangles are
    /// dropped and the whole new frame is marked dirty.
    pub fn set_bounds(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.mark_full();
    }

    /// Add a changed rectangle. Parts outside the frame are discarded.
    pub fn mark_rect(&mut self, rect: Rect) {
        if self.full {
            return;
        }
        let Some(clipped) = rect.clip(self.width, self.height) else {
            return;
        };

        // Keep only the parts not already covered.
        let mut pending = vec![clipped];
        for existing in &self.rects {
            if pending.is_empty() {
                break;
            }
            pending = pending
                .into_iter()
                .flat_map(|p| p.subtract(existing))
                .collect();
        }
        self.rects.extend(pending);

        if self.rects.len() > self.max_tracked {
            if let Some(bbox) = extents(&self.rects) {
                trace!(count = self.rects.len(), "collapsing damage to extents");
                self.rects.clear();
                self.rects.push(bbox);
            }
        }
    }

    /// Mark the whole frame dirty. Takes priority over any rectangles.
    pub fn mark_full(&mut self) {
        self.full = true;
        self.rects.clear();
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.rects.is_empty()
    }

    /// Return and clear the accumulated damage, ordered top-to-bottom then
    /// left-to-right.
    pub fn drain(&mut self) -> Vec<Rect> {
        if std::mem::take(&mut self.full) {
            self.rects.clear();
            return self
                .bounds()
                .clip(self.width, self.height)
                .into_iter()
                .collect();
        }
        let mut out = std::mem::take(&mut self.rects);
        out.sort_by_key(|r| (r.y, r.x));
        out
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(rects: &[Rect], x: i32, y: i32) -> bool {
        rects
            .iter()
            .any(|r| x >= r.x && x < r.right() && y >= r.y && y < r.bottom())
    }

    #[test]
    fn drain_covers_union_of_marks() {
        let mut t = DirtyTracker::new(100, 100);
        let r1 = Rect::new(10, 10, 20, 20);
        let r2 = Rect::new(20, 20, 20, 20);
        t.mark_rect(r1);
        t.mark_rect(r2);

        let out = t.drain();
        for r in [r1, r2] {
            for y in r.y..r.bottom() {
                for x in r.x..r.right() {
                    assert!(covered(&out, x, y), "({x},{y}) not covered");
                }
            }
        }
        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                assert!(!a.intersects(b));
            }
        }
        assert!(t.drain().is_empty());
    }

    #[test]
    fn marks_are_clipped() {
        let mut t = DirtyTracker::new(50, 40);
        t.mark_rect(Rect::new(40, 30, 100, 100));
        t.mark_rect(Rect::new(-5, -5, 3, 3));
        let out = t.drain();
        assert_eq!(out, vec![Rect::new(40, 30, 10, 10)]);
    }

    #[test]
    fn full_flag_dominates() {
        let mut t = DirtyTracker::new(64, 48);
        t.mark_rect(Rect::new(1, 1, 2, 2));
        t.mark_full();
        t.mark_rect(Rect::new(5, 5, 2, 2));
        assert_eq!(t.drain(), vec![Rect::new(0, 0, 64, 48)]);
        assert!(!t.is_full());
        assert!(t.is_empty());
    }

    #[test]
    fn duplicate_marks_do_not_grow() {
        let mut t = DirtyTracker::new(64, 64);
        t.mark_rect(Rect::new(0, 0, 8, 8));
        t.mark_rect(Rect::new(0, 0, 8, 8));
        t.mark_rect(Rect::new(2, 2, 2, 2));
        assert_eq!(t.drain(), vec![Rect::new(0, 0, 8, 8)]);
    }

    #[test]
    fn collapses_past_limit() {
        let mut t = DirtyTracker::with_max_tracked(100, 100, 3);
        for i in 0..4 {
            t.mark_rect(Rect::new(i * 10, i * 10, 2, 2));
        }
        let out = t.drain();
        assert_eq!(out, vec![Rect::new(0, 0, 32, 32)]);
    }

    #[test]
    fn resize_marks_full_new_bounds() {
        let mut t = DirtyTracker::new(10, 10);
        t.mark_rect(Rect::new(0, 0, 5, 5));
        t.set_bounds(20, 5);
        assert_eq!(t.drain(), vec![Rect::new(0, 0, 20, 5)]);
    }
}
