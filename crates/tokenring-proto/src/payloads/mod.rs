//! CBOR-encoded frame payloads.
//!
//! Each opcode has exactly one payload type. Only the inner struct is
//! serialized; the header's opcode already says which type follows, so a
//! frame cannot carry an opcode/payload pair that disagrees.

pub mod session;
pub mod token;

use bytes::BufMut;

use crate::{
    Frame, FrameHeader, Opcode,
    errors::{ProtocolError, Result},
    payloads::token::NodeId,
};

/// All possible frame payloads
///
/// This is the sealed message type handed to the node driver. Raw bytes never
/// travel past [`Payload::from_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Identity exchange
    Hello(session::Hello),
    /// Ring token
    Token(token::Token),
}

impl Payload {
    /// Get the opcode for this payload variant
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Hello(_) => Opcode::Hello,
            Self::Token(_) => Opcode::Token,
        }
    }

    /// Encode payload to buffer
    ///
    /// Serializes only the inner struct, not the variant tag. Size limits are
    /// enforced later by [`Frame::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CborEncode`] if serialization fails.
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();

        match self {
            Self::Hello(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Token(inner) => ciborium::ser::into_writer(inner, &mut writer),
        }
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Decode payload from bytes based on opcode
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if `bytes` exceeds the payload limit
    ///   (checked before any CBOR parsing)
    /// - `ProtocolError::CborDecode` if deserialization fails
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        let payload = match opcode {
            Opcode::Hello => Self::Hello(
                ciborium::de::from_reader(bytes)
                    .map_err(|e| ProtocolError::CborDecode(e.to_string()))?,
            ),
            Opcode::Token => Self::Token(
                ciborium::de::from_reader(bytes)
                    .map_err(|e| ProtocolError::CborDecode(e.to_string()))?,
            ),
        };

        Ok(payload)
    }

    /// Convert payload into a transport frame written by `sender`
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::CborEncode` if serialization fails
    pub fn into_frame(self, sender: NodeId) -> Result<Frame> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;

        let mut header = FrameHeader::new(self.opcode());
        header.set_sender(sender.get());
        Ok(Frame::new(header, buf))
    }

    /// Parse payload from a raw transport frame
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidOpcode` if the header opcode is unknown
    /// - `ProtocolError::CborDecode` if the payload does not match the opcode
    /// - `ProtocolError::SenderMismatch` if a token names a different sender
    ///   than the frame header
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let opcode = frame
            .header
            .opcode_enum()
            .ok_or(ProtocolError::InvalidOpcode(frame.header.opcode()))?;

        let payload = Self::decode(opcode, &frame.payload)?;

        if let Self::Token(token) = &payload {
            let header_sender = frame.header.sender();
            if token.sender().get() != header_sender {
                return Err(ProtocolError::SenderMismatch {
                    header: header_sender,
                    payload: token.sender().get(),
                });
            }
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Hello, Token};

    #[test]
    fn token_frame_carries_sender_in_header() {
        let token = Token::new(5, NodeId::new(1));
        let frame = Payload::Token(token).into_frame(NodeId::new(1)).unwrap();

        assert_eq!(frame.header.opcode_enum(), Some(Opcode::Token));
        assert_eq!(frame.header.sender(), 1);
        assert_eq!(Payload::from_frame(&frame).unwrap(), Payload::Token(token));
    }

    #[test]
    fn hello_decodes_from_wire() {
        let hello = Hello::new("10.0.0.2:9000");
        let frame = Payload::Hello(hello.clone()).into_frame(NodeId::new(2)).unwrap();

        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();
        let parsed = Frame::decode(&wire).unwrap();

        assert_eq!(Payload::from_frame(&parsed).unwrap(), Payload::Hello(hello));
    }

    #[test]
    fn rejects_forged_token_sender() {
        let token = Token::new(3, NodeId::new(2));
        let frame = Payload::Token(token).into_frame(NodeId::new(0)).unwrap();

        assert_eq!(
            Payload::from_frame(&frame),
            Err(ProtocolError::SenderMismatch { header: 0, payload: 2 })
        );
    }

    #[test]
    fn rejects_unknown_opcode() {
        let mut frame = Payload::Token(Token::synchro(NodeId::new(0)))
            .into_frame(NodeId::new(0))
            .unwrap();
        frame.header.opcode = 0x7777u16.to_be_bytes();

        assert_eq!(Payload::from_frame(&frame), Err(ProtocolError::InvalidOpcode(0x7777)));
    }

    #[test]
    fn rejects_payload_of_other_type() {
        // A Hello body under a Token opcode must not decode.
        let hello_frame = Payload::Hello(Hello::new("a")).into_frame(NodeId::new(0)).unwrap();
        let mut header = FrameHeader::new(Opcode::Token);
        header.set_sender(0);
        let frame = Frame::new(header, hello_frame.payload);

        assert!(matches!(Payload::from_frame(&frame), Err(ProtocolError::CborDecode(_))));
    }
}
