//! Frame header with zero-copy parsing.
//!
//! The `FrameHeader` is a fixed 16-byte structure serialized as raw binary
//! (Big Endian). The receiver learns the opcode and the sending node without
//! decoding the CBOR payload.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    Opcode,
    errors::{ProtocolError, Result},
};

/// Fixed 16-byte frame header (Big Endian network byte order)
///
/// Fields are stored as raw byte arrays so every 16-byte pattern is a valid
/// header and casting untrusted bytes cannot cause undefined behavior.
/// Semantic checks (magic, version, flags, payload bound) happen in
/// [`FrameHeader::from_bytes`].
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    // Protocol identification (8 bytes: 0-7)
    magic: [u8; 4],             // 0x544B5247 ("TKRG" in ASCII)
    version: u8,                // 0x01
    flags: u8,                  // reserved, must be zero
    pub(crate) opcode: [u8; 2], // u16 operation code

    // Routing (8 bytes: 8-15)
    sender: [u8; 4],                  // u32 node number of the sender
    pub(crate) payload_size: [u8; 4], // u32 payload length
}

impl FrameHeader {
    /// Size of the serialized header (16 bytes)
    pub const SIZE: usize = 16;

    /// Magic number: "TKRG" in ASCII (0x544B5247)
    pub const MAGIC: u32 = 0x544B_5247;

    /// Current protocol version
    pub const VERSION: u8 = 0x01;

    /// Maximum payload size (64 KiB)
    pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

    /// Create a new header with the specified opcode and zeroed routing fields.
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&Self::MAGIC.to_be_bytes());
        bytes[4] = Self::VERSION;
        bytes[6..8].copy_from_slice(&opcode.to_u16().to_be_bytes());

        Self::read_from_bytes(&bytes)
            .unwrap_or_else(|_| unreachable!("header buffer has exactly SIZE bytes"))
    }

    /// Parse header from network bytes (zero-copy)
    ///
    /// Checks run cheapest first: size, magic, version, flags, payload bound.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if buffer is shorter than 16 bytes
    /// - `ProtocolError::InvalidMagic` if magic number is wrong
    /// - `ProtocolError::UnsupportedVersion` if version is not 0x01
    /// - `ProtocolError::InvalidFlags` if any reserved flag bit is set
    /// - `ProtocolError::PayloadTooLarge` if payload size exceeds maximum
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?
            .0;

        if u32::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        if header.flags != 0 {
            return Err(ProtocolError::InvalidFlags(header.flags));
        }

        let payload_size = u32::from_be_bytes(header.payload_size);
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }

        Ok(header)
    }

    /// Serialize header to bytes
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Protocol magic number (0x544B5247 = "TKRG").
    #[must_use]
    pub fn magic(&self) -> u32 {
        u32::from_be_bytes(self.magic)
    }

    /// Protocol version byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Reserved flags byte.
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Operation code as raw u16.
    #[must_use]
    pub fn opcode(&self) -> u16 {
        u16::from_be_bytes(self.opcode)
    }

    /// Operation code as enum. `None` if unrecognized.
    #[must_use]
    pub fn opcode_enum(&self) -> Option<Opcode> {
        Opcode::from_u16(self.opcode())
    }

    /// Node number of the peer that wrote this frame.
    #[must_use]
    pub fn sender(&self) -> u32 {
        u32::from_be_bytes(self.sender)
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        u32::from_be_bytes(self.payload_size)
    }

    /// Set the sending node number.
    pub fn set_sender(&mut self, sender: u32) {
        self.sender = sender.to_be_bytes();
    }

    /// Set payload size.
    pub fn set_payload_size(&mut self, size: u32) {
        self.payload_size = size.to_be_bytes();
    }
}

// Manual Debug implementation (can't derive due to packed repr)
impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("magic", &format!("{:#010x}", self.magic()))
            .field("version", &self.version())
            .field("flags", &self.flags())
            .field("opcode", &format!("{:#06x}", self.opcode()))
            .field("sender", &self.sender())
            .field("payload_size", &self.payload_size())
            .finish()
    }
}

// Manual PartialEq implementation (can't derive due to packed repr)
impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}
