//! Pointer shape encoding.
//!
//! Host cursors are converted to the wire pointer format: a 1-bpp AND
//! mask, bottom-up, rows padded to 2 bytes, and a top-down 32-bpp XOR
//! (colour) mask. Both are limited to 96×96 pixels.

use serde::{Deserialize, Serialize};

/// Largest pointer edge in pixels.
pub const MAX_CURSOR_SIZE: u32 = 96;

/// Bits per pixel of the colour mask.
pub const XOR_BPP: u32 = 32;

// ── Host cursor ──────────────────────────────────────────────────

/// Pixel data of a host cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorSource {
    /// Premultiplied ARGB, one `u32` per pixel, rows of `width` pixels.
    /// Pixels with a zero alpha are transparent.
    Argb(Vec<u32>),
    /// Two-colour cursor: `source` selects foreground over background
    /// where `mask` is set. Bitmaps are LSB-first with rows padded to
    /// 32 bits. Colours are 16-bit per channel.
    Mono {
        source: Vec<u8>,
        mask: Vec<u8>,
        foreground: [u16; 3],
        background: [u16; 3],
    },
}

/// A cursor as the display host knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorImage {
    pub width: u32,
    pub height: u32,
    pub hotspot_x: u32,
    pub hotspot_y: u32,
    pub source: CursorSource,
}

impl CursorImage {
    /// An opaque ARGB cursor.
    pub fn argb(width: u32, height: u32, hotspot: (u32, u32), pixels: Vec<u32>) -> Self {
        Self {
            width,
            height,
            hotspot_x: hotspot.0,
            hotspot_y: hotspot.1,
            source: CursorSource::Argb(pixels),
        }
    }
}

// ── Wire shape ───────────────────────────────────────────────────

/// Encoded pointer shape, as carried by a set-pointer message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerShape {
    pub hotspot_x: u32,
    pub hotspot_y: u32,
    pub width: u32,
    pub height: u32,
    pub xor_bpp: u32,
    pub xor_mask: Vec<u8>,
    pub and_mask: Vec<u8>,
}

/// What to send for a cursor change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorUpdate {
    Shape(PointerShape),
    /// Hide the pointer.
    Null,
}

/// Row stride of the AND mask for a `width` pixel cursor.
pub fn and_mask_stride(width: u32) -> usize {
    (width as usize).div_ceil(16) * 2
}

struct ShapeBuilder {
    width: usize,
    height: usize,
    xor: Vec<u8>,
    and: Vec<u8>,
}

impl ShapeBuilder {
    fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self {
            width: w,
            height: h,
            xor: vec![0; w * h * 4],
            and: vec![0xFF; and_mask_stride(width) * h],
        }
    }

    /// Make `(x, y)` opaque with colour `argb`. `y` counts from the top.
    fn opaque(&mut self, x: usize, y: usize, argb: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let stride = self.and.len() / self.height;
        let row = self.height - 1 - y;
        self.and[row * stride + x / 8] &= !(0x80 >> (x % 8));

        let offset = (y * self.width + x) * 4;
        self.xor[offset..offset + 4].copy_from_slice(&argb.to_le_bytes());
    }

    fn finish(self, hotspot_x: u32, hotspot_y: u32) -> PointerShape {
        PointerShape {
            hotspot_x,
            hotspot_y,
            width: self.width as u32,
            height: self.height as u32,
            xor_bpp: XOR_BPP,
            xor_mask: self.xor,
            and_mask: self.and,
        }
    }
}

fn lsb_bit(bitmap: &[u8], row_stride: usize, x: usize, y: usize) -> bool {
    bitmap
        .get(y * row_stride + x / 8)
        .is_some_and(|b| b & (1 << (x % 8)) != 0)
}

fn opaque_argb(rgb: [u16; 3]) -> u32 {
    let [r, g, b] = rgb.map(|c| (c >> 8) as u32);
    0xFF00_0000 | (r << 16) | (g << 8) | b
}

/// Encode a host cursor. `None` or an empty cursor hides the pointer.
pub fn encode_cursor(cursor: Option<&CursorImage>) -> CursorUpdate {
    let Some(cursor) = cursor.filter(|c| c.width > 0 && c.height > 0) else {
        return CursorUpdate::Null;
    };

    let cw = cursor.width.min(MAX_CURSOR_SIZE);
    let ch = cursor.height.min(MAX_CURSOR_SIZE);
    let mut shape = ShapeBuilder::new(cw, ch);
    let src_width = cursor.width as usize;

    match &cursor.source {
        CursorSource::Argb(pixels) => {
            for y in 0..ch as usize {
                for x in 0..cw as usize {
                    let p = pixels.get(y * src_width + x).copied().unwrap_or(0);
                    if p >> 24 != 0 {
                        shape.opaque(x, y, p);
                    }
                }
            }
        }
        CursorSource::Mono {
            source,
            mask,
            foreground,
            background,
        } => {
            let stride = src_width.div_ceil(32) * 4;
            let fg = opaque_argb(*foreground);
            let bg = opaque_argb(*background);
            for y in 0..ch as usize {
                for x in 0..cw as usize {
                    if lsb_bit(mask, stride, x, y) {
                        let colour = if lsb_bit(source, stride, x, y) { fg } else { bg };
                        shape.opaque(x, y, colour);
                    }
                }
            }
        }
    }

    // The hotspot must stay inside a clipped shape.
    let hotspot_x = cursor.hotspot_x.min(cw - 1);
    let hotspot_y = cursor.hotspot_y.min(ch - 1);
    CursorUpdate::Shape(shape.finish(hotspot_x, hotspot_y))
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(update: CursorUpdate) -> PointerShape {
        match update {
            CursorUpdate::Shape(s) => s,
            CursorUpdate::Null => panic!("expected a shape"),
        }
    }

    #[test]
    fn empty_cursor_is_null() {
        assert_eq!(encode_cursor(None), CursorUpdate::Null);
        let c = CursorImage::argb(0, 4, (0, 0), vec![]);
        assert_eq!(encode_cursor(Some(&c)), CursorUpdate::Null);
    }

    #[test]
    fn mask_sizes() {
        let c = CursorImage::argb(17, 3, (1, 2), vec![0; 17 * 3]);
        let s = shape(encode_cursor(Some(&c)));
        assert_eq!(and_mask_stride(17), 4);
        assert_eq!(s.and_mask.len(), 4 * 3);
        assert_eq!(s.xor_mask.len(), 17 * 3 * 4);
        assert_eq!((s.hotspot_x, s.hotspot_y), (1, 2));
        // Fully transparent: every AND bit set.
        assert!(s.and_mask.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn clamped_to_96() {
        let c = CursorImage::argb(128, 100, (0, 0), vec![0xFF00_0000; 128 * 100]);
        let s = shape(encode_cursor(Some(&c)));
        assert_eq!((s.width, s.height), (96, 96));
        assert_eq!(s.xor_mask.len(), 96 * 96 * 4);
        assert_eq!(s.and_mask.len(), 12 * 96);
        assert!(s.and_mask.iter().all(|&b| b == 0));
    }

    #[test]
    fn hotspot_stays_inside_clipped_shape() {
        let c = CursorImage::argb(128, 128, (110, 40), vec![0; 128 * 128]);
        let s = shape(encode_cursor(Some(&c)));
        assert_eq!((s.hotspot_x, s.hotspot_y), (95, 40));
    }

    #[test]
    fn and_mask_is_bottom_up_xor_top_down() {
        // 2x2 cursor, only the top-left pixel opaque.
        let c = CursorImage::argb(2, 2, (0, 0), vec![0xFF11_2233, 0, 0, 0]);
        let s = shape(encode_cursor(Some(&c)));
        // Stride 2: row 0 of the mask is the bottom row.
        assert_eq!(s.and_mask, vec![0xFF, 0xFF, 0x7F, 0xFF]);
        assert_eq!(&s.xor_mask[..4], &[0x33, 0x22, 0x11, 0xFF]);
        assert!(s.xor_mask[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn mono_cursor_uses_fg_and_bg() {
        // 2x1: pixel 0 masked + source (fg), pixel 1 masked only (bg).
        let c = CursorImage {
            width: 2,
            height: 1,
            hotspot_x: 0,
            hotspot_y: 0,
            source: CursorSource::Mono {
                source: vec![0b01, 0, 0, 0],
                mask: vec![0b11, 0, 0, 0],
                foreground: [0xFFFF, 0, 0],
                background: [0, 0, 0x8000],
            },
        };
        let s = shape(encode_cursor(Some(&c)));
        assert_eq!(&s.xor_mask[..4], &[0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(&s.xor_mask[4..8], &[0x80, 0x00, 0x00, 0xFF]);
        assert_eq!(s.and_mask, vec![0x3F, 0xFF]);
    }
}
