//! Payloads sent by the backend.

use serde::{Deserialize, Serialize};

use crate::frame::Geometry;

pub const PROTOCOL_VERSION_MAJOR: u32 = 1;
pub const PROTOCOL_VERSION_MINOR: u32 = 0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Default for Version {
    fn default() -> Self {
        Self {
            major: PROTOCOL_VERSION_MAJOR,
            minor: PROTOCOL_VERSION_MINOR,
        }
    }
}

/// Framebuffer layout the client must use to read sync buffers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FramebufferInfo {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub depth: u32,
    pub bytes_per_pixel: u32,
}

impl From<&Geometry> for FramebufferInfo {
    fn from(g: &Geometry) -> Self {
        Self {
            width: g.width,
            height: g.height,
            stride: g.stride as u32,
            depth: g.depth,
            bytes_per_pixel: g.bytes_per_pixel,
        }
    }
}

/// The named buffer now holds the damaged rectangles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReply {
    pub buffer_id: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Beep {
    /// Hertz.
    pub frequency: u32,
    /// Milliseconds.
    pub duration: u32,
}

/// Outcome of a message request. `-1` means the prompt failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageReply {
    pub message_id: u32,
    pub result: i32,
}
