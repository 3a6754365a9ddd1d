//! Payloads sent by the client.
//!
//! # Session start
//! ```text
//! Client ──[Capabilities]──────────────────► Backend
//!   Payload: Capabilities (bincode)
//!
//! Backend ──[FramebufferInfo]──────────────► Client
//! Backend ──[SetPointer | SetNullPointer]──► Client
//! ```
//!
//! # Frame sync (repeated)
//! ```text
//! Client ──[SyncRequest]───────────────────► Backend
//!   Payload: SyncRequest (bincode)
//!
//! Backend ──[SyncReply]────────────────────► Client   (only when damaged)
//! ```

use serde::{Deserialize, Serialize};

use crate::input::TouchContact;

/// Highest number of parameters of a message request.
pub const MAX_MESSAGE_PARAMETERS: usize = 5;

// ── Session ──────────────────────────────────────────────────────

/// Desktop geometry and keyboard layout requested by the client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    pub width: u32,
    pub height: u32,
    /// Windows keyboard layout id (e.g. `0x0409`).
    pub keyboard_layout: u32,
    pub keyboard_type: u32,
}

// ── Sync ─────────────────────────────────────────────────────────

/// "I have buffer `buffer_id`, send me changes."
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncRequest {
    pub buffer_id: u32,
}

// ── Keyboard ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScancodeEvent {
    /// [`KeyboardFlags`](crate::flags::KeyboardFlags) bits.
    pub flags: u16,
    pub scancode: u32,
    pub keyboard_type: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VirtualKeyEvent {
    pub flags: u16,
    pub vk: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnicodeEvent {
    pub flags: u16,
    pub code: u32,
}

/// Remote lock-key state, [`SyncFlags`](crate::flags::SyncFlags) bits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyboardSync {
    pub flags: u32,
}

// ── Pointer ──────────────────────────────────────────────────────

/// Mouse event with absolute coordinates. `flags` holds
/// [`PointerFlags`](crate::flags::PointerFlags) or
/// [`ExtendedPointerFlags`](crate::flags::ExtendedPointerFlags) bits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MouseEvent {
    pub flags: u16,
    pub x: u32,
    pub y: u32,
}

// ── Touch ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TouchFrame {
    pub contacts: Vec<TouchContact>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TouchReleased {
    pub contact_id: u32,
}

// ── Message box ──────────────────────────────────────────────────

/// Ask the backend to show a message to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRequest {
    pub message_id: u32,
    pub message_type: u32,
    pub style: u32,
    /// Seconds; zero waits forever.
    pub timeout: u32,
    /// At most [`MAX_MESSAGE_PARAMETERS`] entries are used.
    pub parameters: Vec<String>,
}
