//! Framebuffer memory and geometry.
//!
//! The [`FrameStore`] owns the pixel bytes the external renderer draws
//! into. It is never resized in place: a geometry change frees the old
//! buffer and allocates a new one, and the whole frame counts as dirty
//! afterwards.

use tracing::{debug, error};

use crate::error::RdsError;
use crate::geometry::Rect;

/// Row pitch alignment in bytes.
pub const STRIDE_ALIGN: usize = 16;

// ── Geometry ─────────────────────────────────────────────────────

/// Derived framebuffer layout for a `width × height × depth` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Colour depth in bits (8, 15, 16, 24 or 32).
    pub depth: u32,
    /// Storage bits per pixel.
    pub bits_per_pixel: u32,
    /// Storage bytes per pixel.
    pub bytes_per_pixel: u32,
    /// Row pitch in bytes, a multiple of [`STRIDE_ALIGN`].
    pub stride: usize,
    /// `stride * height`.
    pub byte_size: usize,
}

impl Geometry {
    /// Compute the layout, rejecting zero sizes and depths without a
    /// byte-addressable pixel format.
    pub fn new(width: u32, height: u32, depth: u32) -> Result<Self, RdsError> {
        if width == 0 || height == 0 {
            return Err(RdsError::InvalidGeometry { width, height });
        }

        let bits_per_pixel = match depth {
            8 => 8,
            15 | 16 => 16,
            24 | 32 => 32,
            other => return Err(RdsError::UnsupportedDepth(other)),
        };
        let bytes_per_pixel = bits_per_pixel / 8;

        let row = (width as usize)
            .checked_mul(bytes_per_pixel as usize)
            .ok_or(RdsError::InvalidGeometry { width, height })?;
        let stride = row
            .checked_next_multiple_of(STRIDE_ALIGN)
            .ok_or(RdsError::InvalidGeometry { width, height })?;
        let byte_size = stride
            .checked_mul(height as usize)
            .ok_or(RdsError::InvalidGeometry { width, height })?;

        Ok(Self {
            width,
            height,
            depth,
            bits_per_pixel,
            bytes_per_pixel,
            stride,
            byte_size,
        })
    }

    /// Whole-frame rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::full(self.width, self.height)
    }

    /// Byte offset of pixel `(x, y)`.
    pub fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride + x as usize * self.bytes_per_pixel as usize
    }
}

// ── FrameStore ───────────────────────────────────────────────────

/// Owned framebuffer memory. Empty until [`create`](Self::create).
#[derive(Debug, Default)]
pub struct FrameStore {
    frame: Option<Frame>,
    generation: u64,
}

#[derive(Debug)]
struct Frame {
    geometry: Geometry,
    data: Vec<u8>,
}

impl Frame {
    fn allocate(geometry: Geometry) -> Result<Self, RdsError> {
        let mut data = Vec::new();
        data.try_reserve_exact(geometry.byte_size).map_err(|_| {
            error!(bytes = geometry.byte_size, "framebuffer allocation failed");
            RdsError::Allocation {
                bytes: geometry.byte_size,
            }
        })?;
        data.resize(geometry.byte_size, 0);
        Ok(Self { geometry, data })
    }
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and zero a frame. Fails if one is already allocated.
    pub fn create(&mut self, width: u32, height: u32, depth: u32) -> Result<&Geometry, RdsError> {
        if self.frame.is_some() {
            return Err(RdsError::ProtocolViolation("framebuffer already allocated"));
        }
        let geometry = Geometry::new(width, height, depth)?;
        let frame = Frame::allocate(geometry)?;
        debug!(
            width,
            height,
            depth,
            stride = geometry.stride,
            "framebuffer created"
        );
        self.generation += 1;
        Ok(&self.frame.insert(frame).geometry)
    }

    /// Release the frame memory.
    pub fn destroy(&mut self) -> Result<(), RdsError> {
        match self.frame.take() {
            Some(_) => Ok(()),
            None => Err(RdsError::NotAllocated),
        }
    }

    /// Replace the frame with a freshly allocated one.
    ///
    /// The new memory is reserved before the old frame is released, so a
    /// failure leaves the store exactly as it was.
    pub fn recreate(&mut self, width: u32, height: u32, depth: u32) -> Result<&Geometry, RdsError> {
        if self.frame.is_none() {
            return Err(RdsError::NotAllocated);
        }
        let geometry = Geometry::new(width, height, depth)?;
        let frame = Frame::allocate(geometry)?;
        debug!(width, height, depth, "framebuffer recreated");
        self.generation += 1;
        Ok(&self.frame.insert(frame).geometry)
    }

    /// Bumped by every successful create or recreate.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_allocated(&self) -> bool {
        self.frame.is_some()
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.frame.as_ref().map(|f| &f.geometry)
    }

    /// Read-only view of the pixel bytes (`byte_size` long).
    pub fn pixels(&self) -> Option<&[u8]> {
        self.frame.as_ref().map(|f| f.data.as_slice())
    }

    /// Mutable pixel view for the renderer.
    pub fn pixels_mut(&mut self) -> Option<&mut [u8]> {
        self.frame.as_mut().map(|f| f.data.as_mut_slice())
    }

    /// Copy one clipped rectangle into `dst`, which uses the same layout.
    ///
    /// `rect` must already lie inside the frame and `dst` must be at
    /// least `byte_size` long; both are checked by the caller.
    pub fn copy_rect_into(&self, rect: &Rect, dst: &mut [u8]) {
        let Some(frame) = self.frame.as_ref() else {
            return;
        };
        let geo = &frame.geometry;
        debug_assert!(geo.bounds().contains(rect));
        debug_assert!(dst.len() >= geo.byte_size);

        let row_bytes = rect.width as usize * geo.bytes_per_pixel as usize;
        let mut offset = geo.offset(rect.x as u32, rect.y as u32);
        for _ in 0..rect.height {
            dst[offset..offset + row_bytes].copy_from_slice(&frame.data[offset..offset + row_bytes]);
            offset += geo.stride;
        }
    }

    /// Copy the whole frame into the front of `dst`.
    pub fn copy_all_into(&self, dst: &mut [u8]) {
        if let Some(frame) = self.frame.as_ref() {
            let n = frame.data.len().min(dst.len());
            dst[..n].copy_from_slice(&frame.data[..n]);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
