//! # rds-core
//!
//! Display and input synchronization core of a remote-session backend.
//!
//! This crate contains:
//! - **Framebuffer**: `FrameStore`, `Geometry` and rectangle math
//! - **Damage sync**: `DirtyTracker`, `SyncBuffer` and the `DamageSyncEngine`
//!   request/attach/copy/reply cycle
//! - **Input**: `InputNormalizer` with button-mask diffing, keyboard
//!   translation, lock-key sync and the touch contact table
//! - **Session**: `SessionController`, the lifecycle state machine and its
//!   collaborator traits
//! - **Wire protocol**: frame header, typed messages, payloads and the
//!   `tokio_util` codec
//! - **Error**: `RdsError`, a `thiserror`-based hierarchy with an error class
//!   per variant

pub mod codec;
pub mod cursor;
pub mod damage;
pub mod engine;
pub mod error;
pub mod flags;
pub mod frame;
pub mod geometry;
pub mod header;
pub mod input;
pub mod message;
pub mod packet;
pub mod protocol;
pub mod session;
pub mod syncbuf;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{ClientCodec, ServerCodec, WireCodec};
pub use cursor::{CursorImage, CursorSource, CursorUpdate, PointerShape, encode_cursor};
pub use damage::DirtyTracker;
pub use engine::DamageSyncEngine;
pub use error::{ErrorClass, RdsError};
pub use flags::{ContactFlags, ExtendedPointerFlags, KeyboardFlags, PointerFlags, SyncFlags};
pub use frame::{FrameStore, Geometry};
pub use geometry::Rect;
pub use header::{FrameHeader, HEADER_LENGTH};
pub use input::{
    HeadlessInput, InputEvent, InputHost, InputNormalizer, InputOptions, TouchContact,
    TouchContactTable, TouchPhase,
};
pub use message::{ClientMessage, MessageType, ServerMessage, WireMessage};
pub use packet::{MAX_PAYLOAD_SIZE, Packet};
pub use session::{
    DisplayHost, HeadlessDisplay, MessageSink, PendingPrompt, Prompt, SessionConfig,
    SessionController, SessionState, SizeLimits, SizePolicy,
};
pub use syncbuf::{BufferProvider, LocalBufferPool, SyncBuffer};
