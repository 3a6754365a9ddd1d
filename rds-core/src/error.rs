//! Domain-specific error types for the session core.
//!
//! All fallible operations return `Result<T, RdsError>`. Every variant
//! belongs to one [`ErrorClass`], which decides what the session does
//! with it: tear the session down, drop a unit of work, retry later, or
//! propagate an allocation failure to whoever asked for the resize.

use std::io;
use thiserror::Error;

/// How the session reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Terminate the session (detach, disconnect, back to Idle). Never the process.
    FatalProtocol,
    /// Drop the offending unit of work, log, continue.
    ResourceExhaustion,
    /// Retry on the next readiness notification; no state change.
    TransientIo,
    /// Framebuffer or buffer creation failed.
    Allocation,
}

/// The canonical error type for the session core.
#[derive(Debug, Error)]
pub enum RdsError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// Received bytes that do not start with the frame magic.
    #[error("invalid magic bytes: expected RDS0")]
    InvalidMagic,

    /// The frame payload failed checksum verification.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// The payload exceeds the codec limit.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A payload could not be decoded into its message type.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A message arrived that the current session state does not allow.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Sync Buffer Errors ───────────────────────────────────────
    /// The client offered a sync buffer that cannot hold the frame.
    #[error("sync buffer {id} too small: {size} bytes, frame needs {needed}")]
    BufferTooSmall { id: u32, size: usize, needed: usize },

    // ── Framebuffer Errors ───────────────────────────────────────
    /// Framebuffer memory could not be reserved.
    #[error("framebuffer allocation of {bytes} bytes failed")]
    Allocation { bytes: usize },

    /// `destroy` was called on an empty frame store.
    #[error("framebuffer not allocated")]
    NotAllocated,

    /// Zero-sized or overflowing geometry.
    #[error("invalid geometry {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },

    /// Colour depth with no pixel layout.
    #[error("unsupported depth: {0}")]
    UnsupportedDepth(u32),

    /// A host-initiated size change beyond the configured maximum.
    #[error("geometry {width}x{height} exceeds limit {max_width}x{max_height}")]
    GeometryLimit {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    // ── Input Errors ─────────────────────────────────────────────
    /// Every touch contact slot is in use.
    #[error("no free touch slot for contact {contact_id}")]
    TouchSlotsExhausted { contact_id: u32 },

    // ── Connection Errors ────────────────────────────────────────
    /// The channel I/O layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// The outbound channel was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// Encoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl RdsError {
    /// The reaction class for this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            RdsError::TouchSlotsExhausted { .. } => ErrorClass::ResourceExhaustion,
            RdsError::Allocation { .. }
            | RdsError::NotAllocated
            | RdsError::InvalidGeometry { .. }
            | RdsError::UnsupportedDepth(_)
            | RdsError::GeometryLimit { .. } => ErrorClass::Allocation,
            RdsError::Connection(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                ErrorClass::TransientIo
            }
            _ => ErrorClass::FatalProtocol,
        }
    }

    /// Returns `true` when the error must end the session.
    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::FatalProtocol
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for RdsError {
    fn from(s: String) -> Self {
        RdsError::Other(s)
    }
}

impl From<&str> for RdsError {
    fn from(s: &str) -> Self {
        RdsError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RdsError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        RdsError::ChannelClosed
    }
}

impl From<Box<bincode::ErrorKind>> for RdsError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        RdsError::MalformedMessage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = RdsError::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = RdsError::BufferTooSmall {
            id: 7,
            size: 1000,
            needed: 4096,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("4096"));
    }

    #[test]
    fn classes_follow_taxonomy() {
        let small = RdsError::BufferTooSmall {
            id: 1,
            size: 0,
            needed: 1,
        };
        assert_eq!(small.class(), ErrorClass::FatalProtocol);
        assert!(small.is_fatal());

        let touch = RdsError::TouchSlotsExhausted { contact_id: 3 };
        assert_eq!(touch.class(), ErrorClass::ResourceExhaustion);
        assert!(!touch.is_fatal());

        assert_eq!(
            RdsError::Allocation { bytes: 1 }.class(),
            ErrorClass::Allocation
        );
    }

    #[test]
    fn would_block_is_transient() {
        let io_err = io::Error::new(io::ErrorKind::WouldBlock, "again");
        let e: RdsError = io_err.into();
        assert_eq!(e.class(), ErrorClass::TransientIo);

        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe broke");
        let e: RdsError = io_err.into();
        assert!(e.is_fatal());
    }

    #[test]
    fn from_string() {
        let e: RdsError = "something broke".into();
        assert!(matches!(e, RdsError::Other(_)));
    }
}
