//! # Token Ring Protocol: Wire Format
//!
//! Binary framing for the token ring liveness protocol.
//!
//! ## Layout
//!
//! - **FrameHeader**: 16 bytes of raw binary (Big Endian), parsed zero-copy
//!   with [`zerocopy`](https://docs.rs/zerocopy). Carries the opcode and the
//!   sending node so frames can be dispatched without touching the payload.
//! - **Payload**: CBOR-encoded structured data. The opcode identifies the
//!   payload type, so no variant tag is serialized.
//!
//! Inbound bytes are validated exactly once, at the transport boundary, by
//! [`Frame::decode`] followed by [`Payload::from_frame`]. Everything past that
//! point works with the sealed [`Payload`] enum and never inspects raw bytes.

pub mod errors;
pub mod frame;
pub mod header;
pub mod opcodes;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use opcodes::Opcode;
pub use payloads::{
    Payload,
    session::{Hello, PROTOCOL_VERSION},
    token::{NodeId, Token},
};
