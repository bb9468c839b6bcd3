//! Fuzz target for Payload::from_frame
//!
//! Feeds arbitrary CBOR under every opcode and an arbitrary header sender.
//! Decoding must never panic, and an accepted token always names the header
//! sender.

#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use tokenring_proto::{Frame, FrameHeader, Opcode, Payload};

fuzz_target!(|input: (u32, &[u8])| {
    let (sender, data) = input;

    for opcode in [Opcode::Hello, Opcode::Token] {
        let mut header = FrameHeader::new(opcode);
        header.set_sender(sender);

        let frame = Frame::new(header, Bytes::copy_from_slice(data));

        if let Ok(Payload::Token(token)) = Payload::from_frame(&frame) {
            assert_eq!(token.sender().get(), sender);
        }
    }
});
