//! Length-prefixed framing for `tokio_util::codec::Framed`.
//!
//! A frame is a [`FrameHeader`] followed by `payload_length` bytes. The
//! decoder waits for the whole frame, verifies the checksum and hands out
//! the typed message; the encoder does the reverse.

use std::marker::PhantomData;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::RdsError;
use crate::header::{FrameHeader, FrameHeaderBytes, HEADER_LENGTH};
use crate::message::{ClientMessage, ServerMessage, WireMessage};
use crate::packet::{MAX_PAYLOAD_SIZE, Packet};

/// Decodes `In`, encodes `Out`.
pub struct WireCodec<In, Out> {
    _marker: PhantomData<fn(Out) -> In>,
}

/// Backend side: reads client messages, writes backend messages.
pub type ServerCodec = WireCodec<ClientMessage, ServerMessage>;

/// Client side, used by tests and tooling.
pub type ClientCodec = WireCodec<ServerMessage, ClientMessage>;

impl<In, Out> WireCodec<In, Out> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<In, Out> Default for WireCodec<In, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In: WireMessage, Out> Decoder for WireCodec<In, Out> {
    type Item = In;
    type Error = RdsError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LENGTH {
            return Ok(None);
        }

        let mut raw: FrameHeaderBytes = [0; HEADER_LENGTH];
        raw.copy_from_slice(&src[..HEADER_LENGTH]);
        let header = FrameHeader::from_bytes(&raw)?;

        let payload_length = header.payload_length() as usize;
        if payload_length > MAX_PAYLOAD_SIZE {
            return Err(RdsError::PayloadTooLarge {
                size: payload_length,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        if payload_length > 0 && header.checksum() == 0 {
            return Err(RdsError::ChecksumMismatch);
        }

        let total = HEADER_LENGTH + payload_length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LENGTH);
        let payload = src.split_to(payload_length).to_vec();
        let packet = Packet::from_parts(header, payload)?;
        packet.into_message().map(Some)
    }
}

impl<In, Out: WireMessage> Encoder<Out> for WireCodec<In, Out> {
    type Error = RdsError;

    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let packet = Packet::from_message(&item)?;
        dst.reserve(packet.encoded_len());
        dst.extend_from_slice(&packet.header().to_bytes());
        dst.extend_from_slice(packet.payload());
        Ok(())
    }
}
