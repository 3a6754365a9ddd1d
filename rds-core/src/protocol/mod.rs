//! Structured payloads of the client/backend protocol.
//!
//! Each payload is serialized with `serde` + `bincode` and carried in one
//! frame whose header names the [`MessageType`](crate::message::MessageType).

pub mod client;
pub mod server;

pub use client::{
    Capabilities, KeyboardSync, MessageRequest, MouseEvent, ScancodeEvent, SyncRequest,
    TouchFrame, TouchReleased, UnicodeEvent, VirtualKeyEvent,
};
pub use server::{Beep, FramebufferInfo, MessageReply, SyncReply, Version};
