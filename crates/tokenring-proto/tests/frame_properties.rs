//! Property-based tests for frame and payload decoding
//!
//! Decoding is the trust boundary: every inbound byte sequence goes through
//! `Frame::decode` and `Payload::from_frame`. These properties check that the
//! boundary never panics, never over-reads, and only yields tokens whose
//! payload sender agrees with the header.

use bytes::Bytes;
use proptest::prelude::*;
use tokenring_proto::{
    Frame, FrameHeader, Hello, NodeId, Opcode, Payload, ProtocolError, Token,
};

fn arbitrary_token() -> impl Strategy<Value = Token> {
    (any::<u64>(), 0u32..64).prop_map(|(counter, sender)| Token::new(counter, NodeId::new(sender)))
}

#[test]
fn prop_token_frames_survive_the_wire() {
    proptest!(|(token in arbitrary_token())| {
        let frame = Payload::Token(token).into_frame(token.sender()).expect("encode payload");

        let mut buf = Vec::new();
        frame.encode(&mut buf).expect("encode frame");
        prop_assert_eq!(buf.len(), frame.wire_len());

        let decoded = Frame::decode(&buf).expect("decode frame");
        let payload = Payload::from_frame(&decoded).expect("decode payload");

        // PROPERTY: Token identity survives, including the synchro marker
        prop_assert_eq!(payload, Payload::Token(token));
    });
}

#[test]
fn prop_mismatched_sender_is_rejected() {
    proptest!(|(token in arbitrary_token(), header_sender in 0u32..64)| {
        prop_assume!(header_sender != token.sender().get());

        let frame = Payload::Token(token)
            .into_frame(NodeId::new(header_sender))
            .expect("encode payload");

        // PROPERTY: A token can never claim a sender other than the frame's
        prop_assert_eq!(
            Payload::from_frame(&frame),
            Err(ProtocolError::SenderMismatch {
                header: header_sender,
                payload: token.sender().get(),
            })
        );
    });
}

#[test]
fn prop_truncated_frames_are_rejected() {
    proptest!(|(identity in "[a-z0-9.:]{1,32}", cut in 1usize..16)| {
        let frame = Payload::Hello(Hello::new(identity))
            .into_frame(NodeId::new(0))
            .expect("encode payload");
        let mut buf = Vec::new();
        frame.encode(&mut buf).expect("encode frame");

        let cut = cut.min(frame.payload.len());
        let truncated = &buf[..buf.len() - cut];

        // PROPERTY: Missing payload bytes are reported, never read past
        let is_truncated = matches!(
            Frame::decode(truncated),
            Err(ProtocolError::FrameTruncated { .. })
        );
        prop_assert!(is_truncated);
    });
}

#[test]
fn prop_garbage_never_panics() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..256))| {
        // PROPERTY: Arbitrary input either decodes or errors
        if let Ok(frame) = Frame::decode(&bytes) {
            prop_assert!(frame.payload.len() <= FrameHeader::MAX_PAYLOAD_SIZE as usize);
            let _ = Payload::from_frame(&frame);
        }
    });
}

#[test]
fn prop_valid_header_with_garbage_payload_never_panics() {
    proptest!(|(payload in prop::collection::vec(any::<u8>(), 0..128), hello in any::<bool>())| {
        let opcode = if hello { Opcode::Hello } else { Opcode::Token };
        let frame = Frame::new(FrameHeader::new(opcode), Bytes::from(payload));

        // PROPERTY: Opcode-directed CBOR decoding tolerates any body
        let _ = Payload::from_frame(&frame);
    });
}
