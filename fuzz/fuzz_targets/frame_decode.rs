//! Fuzz target for Frame::decode
//!
//! Arbitrary bytes must never panic the frame parser. Every input either
//! decodes or returns an error, and a decoded frame re-encodes to the exact
//! bytes it consumed.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tokenring_proto::Frame;

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = Frame::decode(data) {
        let mut buf = Vec::new();
        frame.encode(&mut buf).expect("decoded frame must re-encode");
        assert_eq!(buf.as_slice(), &data[..frame.wire_len()]);
    }
});
