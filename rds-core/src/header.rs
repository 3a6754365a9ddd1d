//! Fixed-size frame header.
//!
//! ```text
//!  0       4          6          8            12          16
//!  | magic | msg type | reserved | payload len | checksum |
//! ```
//!
//! All fields little-endian.

use crate::error::RdsError;

pub const MAGIC: [u8; 4] = *b"RDS0";
pub const HEADER_LENGTH: usize = 16;

pub type FrameHeaderBytes = [u8; HEADER_LENGTH];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    message_type: u16,
    payload_length: u32,
    checksum: u32,
}

impl FrameHeader {
    pub fn new(message_type: u16, payload_length: u32, checksum: u32) -> Self {
        Self {
            message_type,
            payload_length,
            checksum,
        }
    }

    pub fn to_bytes(&self) -> FrameHeaderBytes {
        let mut bytes: FrameHeaderBytes = [0; HEADER_LENGTH];
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4..6].copy_from_slice(&self.message_type.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.payload_length.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &FrameHeaderBytes) -> Result<Self, RdsError> {
        if bytes[0..4] != MAGIC {
            return Err(RdsError::InvalidMagic);
        }
        Ok(Self {
            message_type: u16::from_le_bytes([bytes[4], bytes[5]]),
            payload_length: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            checksum: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        })
    }

    pub fn message_type(&self) -> u16 {
        self.message_type
    }

    pub fn payload_length(&self) -> u32 {
        self.payload_length
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }
}

/// First four bytes of the blake3 hash of `payload`, zero when empty.
pub fn payload_checksum(payload: &[u8]) -> u32 {
    if payload.is_empty() {
        return 0;
    }
    let hash = blake3::hash(payload);
    let b = hash.as_bytes();
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        let h = FrameHeader::new(0x0102, 7, 0xAABBCCDD);
        let b = h.to_bytes();
        assert_eq!(&b[0..4], b"RDS0");
        assert_eq!(&b[4..6], &[0x02, 0x01]);
        assert_eq!(&b[6..8], &[0, 0]);
        assert_eq!(&b[8..12], &[7, 0, 0, 0]);
        assert_eq!(&b[12..16], &[0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(FrameHeader::from_bytes(&b).unwrap(), h);
    }

    #[test]
    fn bad_magic() {
        let mut b = FrameHeader::new(1, 0, 0).to_bytes();
        b[0] = b'X';
        assert!(matches!(FrameHeader::from_bytes(&b), Err(RdsError::InvalidMagic)));
    }

    #[test]
    fn empty_payload_has_zero_checksum() {
        assert_eq!(payload_checksum(&[]), 0);
        assert_ne!(payload_checksum(b"abc"), payload_checksum(b"abd"));
    }
}
