//! Frame type combining header and payload.
//!
//! A `Frame` is the transport-layer packet:
//! - 16-byte raw binary header (Big Endian)
//! - Variable-length payload bytes (already CBOR-encoded)
//!
//! This is a pure data holder. For typed access see `Payload::into_frame()`
//! and `Payload::from_frame()`.

use bytes::{BufMut, Bytes};

use crate::{
    FrameHeader,
    errors::{ProtocolError, Result},
};

/// Complete protocol frame (transport layer)
///
/// Layout on the wire:
/// `[FrameHeader: 16 bytes, raw binary] + [payload: variable bytes]`
///
/// # Invariants
///
/// - `payload.len()` matches `header.payload_size()`. Enforced by
///   [`Frame::new`] and verified by [`Frame::decode`].
/// - `payload.len()` never exceeds [`FrameHeader::MAX_PAYLOAD_SIZE`] on the
///   wire. Oversized frames are rejected by [`Frame::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header (16 bytes)
    pub header: FrameHeader,

    /// Raw payload bytes (already CBOR-encoded)
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame, setting the header's payload size to match.
    ///
    /// Does not enforce the payload limit; [`Frame::encode`] does.
    #[must_use]
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();

        // Saturate so an impossible length still fails the encode-time bound.
        let payload_len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
        header.set_payload_size(payload_len);

        Self { header, payload }
    }

    /// Total number of bytes this frame occupies on the wire.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        FrameHeader::SIZE + self.payload.len()
    }

    /// Encode frame into buffer
    ///
    /// Writes: `[header (16 bytes)] + [payload (variable)]`
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if payload exceeds `MAX_PAYLOAD_SIZE`
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        debug_assert_eq!(self.payload.len(), self.header.payload_size() as usize);

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Decode frame from wire format
    ///
    /// Validates the header and copies exactly `payload_size` bytes. Trailing
    /// bytes are ignored; the payload is not deserialized.
    ///
    /// # Errors
    ///
    /// - Any header error from [`FrameHeader::from_bytes`]
    /// - `ProtocolError::FrameTruncated` if fewer payload bytes are present
    ///   than the header claims
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;

        let payload_size = header.payload_size() as usize;
        let total_size = FrameHeader::SIZE + payload_size;

        let payload = bytes.get(FrameHeader::SIZE..total_size).ok_or(
            ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            },
        )?;

        Ok(Self { header: *header, payload: Bytes::copy_from_slice(payload) })
    }
}
