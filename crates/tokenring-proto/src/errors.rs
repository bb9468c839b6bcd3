//! Error types for the token ring wire format.
//!
//! All errors are structured and carry enough context to log the offending
//! frame without re-parsing it.

use thiserror::Error;

/// Protocol-level errors that can occur during frame parsing and validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is shorter than the fixed header size
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum size in bytes
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// Invalid magic number in frame header
    #[error("invalid magic number: expected 0x544B5247 (\"TKRG\")")]
    InvalidMagic,

    /// Unsupported protocol version
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Reserved flag bits were set
    #[error("invalid flags: {0:#04x}")]
    InvalidFlags(u8),

    /// Payload exceeds maximum allowed size
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Frame is truncated (header claims more data than available)
    #[error("frame truncated: header claims {expected} payload bytes, but only {actual} available")]
    FrameTruncated {
        /// Expected payload size from header
        expected: usize,
        /// Actual bytes available
        actual: usize,
    },

    /// Invalid or unknown opcode
    #[error("invalid opcode: {0:#06x}")]
    InvalidOpcode(u16),

    /// Failed to encode data as CBOR
    #[error("failed to encode CBOR: {0}")]
    CborEncode(String),

    /// Failed to decode CBOR data
    #[error("failed to decode CBOR: {0}")]
    CborDecode(String),

    /// Token payload names a different sender than the frame header
    #[error("sender mismatch: header says node {header}, token says node {payload}")]
    SenderMismatch {
        /// Sender recorded in the frame header
        header: u32,
        /// Sender recorded in the token payload
        payload: u32,
    },
}

/// Convenient Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
