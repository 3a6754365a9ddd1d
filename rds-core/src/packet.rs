//! One encoded frame: header plus payload bytes.

use crate::error::RdsError;
use crate::header::{FrameHeader, HEADER_LENGTH, payload_checksum};
use crate::message::{MessageType, WireMessage};

/// Largest payload accepted in either direction.
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: FrameHeader,
    payload: Vec<u8>,
}

impl Packet {
    /// Build a frame, computing the checksum.
    pub fn new(message_type: MessageType, payload: Vec<u8>) -> Result<Self, RdsError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(RdsError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let header = FrameHeader::new(
            message_type as u16,
            payload.len() as u32,
            payload_checksum(&payload),
        );
        Ok(Self { header, payload })
    }

    /// Encode a typed message.
    pub fn from_message<M: WireMessage>(message: &M) -> Result<Self, RdsError> {
        Self::new(message.message_type(), message.encode_payload()?)
    }

    /// Pair a received header with its payload.
    pub fn from_parts(header: FrameHeader, payload: Vec<u8>) -> Result<Self, RdsError> {
        if payload.len() != header.payload_length() as usize {
            return Err(RdsError::MalformedMessage(format!(
                "payload is {} bytes, header says {}",
                payload.len(),
                header.payload_length()
            )));
        }
        Ok(Self { header, payload })
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn message_type(&self) -> Result<MessageType, RdsError> {
        MessageType::try_from(self.header.message_type())
    }

    /// `true` when the checksum matches the payload.
    pub fn validate(&self) -> bool {
        self.header.checksum() == payload_checksum(&self.payload)
    }

    /// Decode into a typed message after checking the checksum.
    pub fn into_message<M: WireMessage>(self) -> Result<M, RdsError> {
        if !self.validate() {
            return Err(RdsError::ChecksumMismatch);
        }
        M::decode(self.message_type()?, &self.payload)
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_LENGTH + self.payload.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ServerMessage;
    use crate::protocol::SyncReply;

    #[test]
    fn tampered_payload_fails_checksum() {
        let packet =
            Packet::from_message(&ServerMessage::SyncReply(SyncReply { buffer_id: 9 })).unwrap();
        assert!(packet.validate());

        let mut payload = packet.payload().to_vec();
        payload[0] ^= 0xFF;
        let tampered = Packet::from_parts(*packet.header(), payload).unwrap();
        assert!(matches!(
            tampered.into_message::<ServerMessage>(),
            Err(RdsError::ChecksumMismatch)
        ));
    }

    #[test]
    fn oversized_payload_rejected() {
        let err = Packet::new(MessageType::TouchFrame, vec![0; MAX_PAYLOAD_SIZE + 1]).unwrap_err();
        assert!(matches!(err, RdsError::PayloadTooLarge { .. }));
    }

    #[test]
    fn null_pointer_has_empty_payload() {
        let packet = Packet::from_message(&ServerMessage::SetNullPointer).unwrap();
        assert_eq!(packet.encoded_len(), HEADER_LENGTH);
        assert_eq!(packet.header().checksum(), 0);
        assert_eq!(
            packet.into_message::<ServerMessage>().unwrap(),
            ServerMessage::SetNullPointer
        );
    }
}
