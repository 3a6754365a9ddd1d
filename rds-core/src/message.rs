//! Message types and the typed messages of each direction.
//!
//! Uses proper enums with `TryFrom`, no panics on unknown values.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cursor::PointerShape;
use crate::error::RdsError;
use crate::protocol::{
    Beep, Capabilities, FramebufferInfo, KeyboardSync, MessageReply, MessageRequest, MouseEvent,
    ScancodeEvent, SyncReply, SyncRequest, TouchFrame, TouchReleased, UnicodeEvent,
    VirtualKeyEvent, Version,
};

// ── MessageType ──────────────────────────────────────────────────

/// Frame type tag.
///
/// - `0x00xx`: client to backend
/// - `0x01xx`: backend to client
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    // ── Client (0x00xx) ──────────────────────────────────────────
    Capabilities = 0x0001,
    SyncRequest = 0x0002,
    ImmediateSyncRequest = 0x0003,
    KeyboardScancode = 0x0010,
    KeyboardVirtualKey = 0x0011,
    KeyboardUnicode = 0x0012,
    KeyboardSync = 0x0013,
    Mouse = 0x0020,
    ExtendedMouse = 0x0021,
    TouchFrame = 0x0030,
    TouchReleased = 0x0031,
    MessageRequest = 0x0040,

    // ── Backend (0x01xx) ─────────────────────────────────────────
    Version = 0x0101,
    FramebufferInfo = 0x0102,
    SyncReply = 0x0103,
    SetPointer = 0x0104,
    SetNullPointer = 0x0105,
    Beep = 0x0106,
    MessageReply = 0x0107,
}

impl TryFrom<u16> for MessageType {
    type Error = RdsError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0x0001 => Self::Capabilities,
            0x0002 => Self::SyncRequest,
            0x0003 => Self::ImmediateSyncRequest,
            0x0010 => Self::KeyboardScancode,
            0x0011 => Self::KeyboardVirtualKey,
            0x0012 => Self::KeyboardUnicode,
            0x0013 => Self::KeyboardSync,
            0x0020 => Self::Mouse,
            0x0021 => Self::ExtendedMouse,
            0x0030 => Self::TouchFrame,
            0x0031 => Self::TouchReleased,
            0x0040 => Self::MessageRequest,

            0x0101 => Self::Version,
            0x0102 => Self::FramebufferInfo,
            0x0103 => Self::SyncReply,
            0x0104 => Self::SetPointer,
            0x0105 => Self::SetNullPointer,
            0x0106 => Self::Beep,
            0x0107 => Self::MessageReply,

            _ => {
                return Err(RdsError::UnknownVariant {
                    type_name: "MessageType",
                    value: value as u64,
                });
            }
        })
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl MessageType {
    /// `true` for types the client sends.
    pub fn is_client(&self) -> bool {
        (*self as u16) < 0x0100
    }
}

// ── WireMessage ──────────────────────────────────────────────────

/// A typed message that maps to one frame.
pub trait WireMessage: Sized {
    fn message_type(&self) -> MessageType;

    fn encode_payload(&self) -> Result<Vec<u8>, RdsError>;

    fn decode(message_type: MessageType, payload: &[u8]) -> Result<Self, RdsError>;
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RdsError> {
    bincode::serialize(value).map_err(|e| RdsError::Encoding(e.to_string()))
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, RdsError> {
    Ok(bincode::deserialize(payload)?)
}

// ── ClientMessage ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Capabilities(Capabilities),
    SyncRequest(SyncRequest),
    ImmediateSyncRequest(SyncRequest),
    KeyboardScancode(ScancodeEvent),
    KeyboardVirtualKey(VirtualKeyEvent),
    KeyboardUnicode(UnicodeEvent),
    KeyboardSync(KeyboardSync),
    Mouse(MouseEvent),
    ExtendedMouse(MouseEvent),
    TouchFrame(TouchFrame),
    TouchReleased(TouchReleased),
    MessageRequest(MessageRequest),
}

impl WireMessage for ClientMessage {
    fn message_type(&self) -> MessageType {
        match self {
            Self::Capabilities(_) => MessageType::Capabilities,
            Self::SyncRequest(_) => MessageType::SyncRequest,
            Self::ImmediateSyncRequest(_) => MessageType::ImmediateSyncRequest,
            Self::KeyboardScancode(_) => MessageType::KeyboardScancode,
            Self::KeyboardVirtualKey(_) => MessageType::KeyboardVirtualKey,
            Self::KeyboardUnicode(_) => MessageType::KeyboardUnicode,
            Self::KeyboardSync(_) => MessageType::KeyboardSync,
            Self::Mouse(_) => MessageType::Mouse,
            Self::ExtendedMouse(_) => MessageType::ExtendedMouse,
            Self::TouchFrame(_) => MessageType::TouchFrame,
            Self::TouchReleased(_) => MessageType::TouchReleased,
            Self::MessageRequest(_) => MessageType::MessageRequest,
        }
    }

    fn encode_payload(&self) -> Result<Vec<u8>, RdsError> {
        match self {
            Self::Capabilities(m) => encode(m),
            Self::SyncRequest(m) | Self::ImmediateSyncRequest(m) => encode(m),
            Self::KeyboardScancode(m) => encode(m),
            Self::KeyboardVirtualKey(m) => encode(m),
            Self::KeyboardUnicode(m) => encode(m),
            Self::KeyboardSync(m) => encode(m),
            Self::Mouse(m) | Self::ExtendedMouse(m) => encode(m),
            Self::TouchFrame(m) => encode(m),
            Self::TouchReleased(m) => encode(m),
            Self::MessageRequest(m) => encode(m),
        }
    }

    fn decode(message_type: MessageType, payload: &[u8]) -> Result<Self, RdsError> {
        Ok(match message_type {
            MessageType::Capabilities => Self::Capabilities(decode(payload)?),
            MessageType::SyncRequest => Self::SyncRequest(decode(payload)?),
            MessageType::ImmediateSyncRequest => Self::ImmediateSyncRequest(decode(payload)?),
            MessageType::KeyboardScancode => Self::KeyboardScancode(decode(payload)?),
            MessageType::KeyboardVirtualKey => Self::KeyboardVirtualKey(decode(payload)?),
            MessageType::KeyboardUnicode => Self::KeyboardUnicode(decode(payload)?),
            MessageType::KeyboardSync => Self::KeyboardSync(decode(payload)?),
            MessageType::Mouse => Self::Mouse(decode(payload)?),
            MessageType::ExtendedMouse => Self::ExtendedMouse(decode(payload)?),
            MessageType::TouchFrame => Self::TouchFrame(decode(payload)?),
            MessageType::TouchReleased => Self::TouchReleased(decode(payload)?),
            MessageType::MessageRequest => Self::MessageRequest(decode(payload)?),
            _ => {
                return Err(RdsError::ProtocolViolation(
                    "backend message type sent by client",
                ));
            }
        })
    }
}

// ── ServerMessage ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Version(Version),
    FramebufferInfo(FramebufferInfo),
    SyncReply(SyncReply),
    SetPointer(PointerShape),
    SetNullPointer,
    Beep(Beep),
    MessageReply(MessageReply),
}

impl WireMessage for ServerMessage {
    fn message_type(&self) -> MessageType {
        match self {
            Self::Version(_) => MessageType::Version,
            Self::FramebufferInfo(_) => MessageType::FramebufferInfo,
            Self::SyncReply(_) => MessageType::SyncReply,
            Self::SetPointer(_) => MessageType::SetPointer,
            Self::SetNullPointer => MessageType::SetNullPointer,
            Self::Beep(_) => MessageType::Beep,
            Self::MessageReply(_) => MessageType::MessageReply,
        }
    }

    fn encode_payload(&self) -> Result<Vec<u8>, RdsError> {
        match self {
            Self::Version(m) => encode(m),
            Self::FramebufferInfo(m) => encode(m),
            Self::SyncReply(m) => encode(m),
            Self::SetPointer(m) => encode(m),
            Self::SetNullPointer => Ok(Vec::new()),
            Self::Beep(m) => encode(m),
            Self::MessageReply(m) => encode(m),
        }
    }

    fn decode(message_type: MessageType, payload: &[u8]) -> Result<Self, RdsError> {
        Ok(match message_type {
            MessageType::Version => Self::Version(decode(payload)?),
            MessageType::FramebufferInfo => Self::FramebufferInfo(decode(payload)?),
            MessageType::SyncReply => Self::SyncReply(decode(payload)?),
            MessageType::SetPointer => Self::SetPointer(decode(payload)?),
            MessageType::SetNullPointer => Self::SetNullPointer,
            MessageType::Beep => Self::Beep(decode(payload)?),
            MessageType::MessageReply => Self::MessageReply(decode(payload)?),
            _ => {
                return Err(RdsError::ProtocolViolation(
                    "client message type sent by backend",
                ));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_roundtrip() {
        let types = [
            MessageType::Capabilities,
            MessageType::SyncRequest,
            MessageType::ImmediateSyncRequest,
            MessageType::KeyboardScancode,
            MessageType::KeyboardVirtualKey,
            MessageType::KeyboardUnicode,
            MessageType::KeyboardSync,
            MessageType::Mouse,
            MessageType::ExtendedMouse,
            MessageType::TouchFrame,
            MessageType::TouchReleased,
            MessageType::MessageRequest,
            MessageType::Version,
            MessageType::FramebufferInfo,
            MessageType::SyncReply,
            MessageType::SetPointer,
            MessageType::SetNullPointer,
            MessageType::Beep,
            MessageType::MessageReply,
        ];
        for t in types {
            assert_eq!(MessageType::try_from(t as u16).unwrap(), t);
        }
    }

    #[test]
    fn message_type_invalid() {
        assert!(matches!(
            MessageType::try_from(0xBEEF),
            Err(RdsError::UnknownVariant { value: 0xBEEF, .. })
        ));
    }

    #[test]
    fn direction_is_enforced() {
        assert!(MessageType::Mouse.is_client());
        assert!(!MessageType::SyncReply.is_client());
        let payload = SyncReply { buffer_id: 1 };
        let bytes = bincode::serialize(&payload).unwrap();
        assert!(ClientMessage::decode(MessageType::SyncReply, &bytes).is_err());
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let err = ClientMessage::decode(MessageType::Mouse, &[1, 2]).unwrap_err();
        assert!(matches!(err, RdsError::MalformedMessage(_)));
        assert!(err.is_fatal());
    }
}
