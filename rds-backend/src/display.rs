//! Headless software display: a renderer that paints test content into
//! the session framebuffer and a display host that records layout and
//! geometry changes.

use tracing::{debug, info};

use rds_core::{CursorImage, DisplayHost, FrameStore, Geometry, Rect};

/// Width of the moving bar.
const BAR_WIDTH: u32 = 16;
/// Pixels the bar advances per frame.
const BAR_STEP: u64 = 4;
const BACKGROUND: u32 = 0xFF20_2428;

// ── SoftwareDisplay ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SoftwareDisplay {
    layout: Option<String>,
    geometry: Option<Geometry>,
}

impl SoftwareDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }
}

impl DisplayHost for SoftwareDisplay {
    fn apply_keyboard_layout(&mut self, layout: &str) {
        if self.layout.as_deref() != Some(layout) {
            info!(layout, "keyboard layout applied");
            self.layout = Some(layout.to_string());
        }
    }

    fn framebuffer_changed(&mut self, geometry: &Geometry) {
        debug!(
            width = geometry.width,
            height = geometry.height,
            "display geometry changed"
        );
        self.geometry = Some(*geometry);
    }
}

/// The arrow cursor shown by the software display.
pub fn arrow_cursor() -> CursorImage {
    const WIDTH: u32 = 11;
    const HEIGHT: u32 = 16;
    let mut pixels = vec![0u32; (WIDTH * HEIGHT) as usize];
    for y in 0..HEIGHT {
        for x in 0..WIDTH.min(y + 1) {
            let edge = x == 0 || x == y || y == HEIGHT - 1;
            pixels[(y * WIDTH + x) as usize] = if edge { 0xFF00_0000 } else { 0xFFFF_FFFF };
        }
    }
    CursorImage::argb(WIDTH, HEIGHT, (0, 0), pixels)
}

// ── SoftwareRenderer ─────────────────────────────────────────────

/// Paints a bar sweeping across the frame, one step per tick.
#[derive(Debug, Default)]
pub struct SoftwareRenderer {
    frames: u64,
    bar: Option<Rect>,
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Draw the next frame and return the damaged rectangles.
    pub fn render(&mut self, frame: &mut FrameStore) -> Vec<Rect> {
        let Some(geometry) = frame.geometry().copied() else {
            return Vec::new();
        };
        let Some(pixels) = frame.pixels_mut() else {
            return Vec::new();
        };

        self.frames += 1;
        let mut damaged = Vec::with_capacity(2);

        if let Some(old) = self
            .bar
            .take()
            .and_then(|r| r.clip(geometry.width, geometry.height))
        {
            fill(pixels, &geometry, &old, BACKGROUND);
            damaged.push(old);
        }

        let x = ((self.frames * BAR_STEP) % u64::from(geometry.width)) as u32;
        let bar = Rect::new(
            x as i32,
            0,
            BAR_WIDTH.min(geometry.width - x) as i32,
            geometry.height as i32,
        );
        let shade = (self.frames % 0xC0) as u32 + 0x40;
        fill(pixels, &geometry, &bar, 0xFF00_0000 | shade << 16 | shade << 8);
        damaged.push(bar);
        self.bar = Some(bar);

        damaged
    }
}

fn fill(pixels: &mut [u8], geometry: &Geometry, rect: &Rect, argb: u32) {
    let bpp = geometry.bytes_per_pixel as usize;
    let color = argb.to_le_bytes();
    let len = rect.width as usize * bpp;
    for y in rect.y..rect.bottom() {
        let start = geometry.offset(rect.x as u32, y as u32);
        let Some(row) = pixels.get_mut(start..start + len) else {
            return;
        };
        for pixel in row.chunks_exact_mut(bpp) {
            pixel.copy_from_slice(&color[..bpp]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_moves_and_damages_old_position() {
        let mut frame = FrameStore::new();
        frame.create(64, 8, 24).unwrap();
        let mut renderer = SoftwareRenderer::new();

        let first = renderer.render(&mut frame);
        assert_eq!(first, vec![Rect::new(4, 0, 16, 8)]);

        let second = renderer.render(&mut frame);
        assert_eq!(second, vec![Rect::new(4, 0, 16, 8), Rect::new(8, 0, 16, 8)]);

        let g = *frame.geometry().unwrap();
        let px = frame.pixels().unwrap();
        assert_eq!(px[g.offset(4, 0)..g.offset(4, 0) + 4], BACKGROUND.to_le_bytes());
        assert_ne!(px[g.offset(8, 0)..g.offset(8, 0) + 4], BACKGROUND.to_le_bytes());
    }

    #[test]
    fn bar_is_clipped_after_shrink() {
        let mut frame = FrameStore::new();
        frame.create(64, 8, 16).unwrap();
        let mut renderer = SoftwareRenderer::new();
        for _ in 0..14 {
            renderer.render(&mut frame);
        }
        frame.recreate(40, 8, 16).unwrap();
        let damaged = renderer.render(&mut frame);
        assert!(damaged.iter().all(|r| r.right() <= 40));
    }

    #[test]
    fn arrow_has_opaque_tip() {
        let cursor = arrow_cursor();
        let rds_core::CursorSource::Argb(pixels) = &cursor.source else {
            panic!("argb cursor expected");
        };
        assert_eq!(pixels[0] >> 24, 0xFF);
        assert_eq!(pixels[(cursor.width - 1) as usize], 0);
    }

    #[test]
    fn layout_is_recorded() {
        let mut display = SoftwareDisplay::new();
        display.apply_keyboard_layout("fr");
        assert_eq!(display.layout(), Some("fr"));
    }
}
