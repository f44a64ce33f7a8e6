//! Fuzz target: `LineAssembler`
//!
//! The first input byte picks a chunk size; the rest is the serial stream.
//! Verifies:
//! - No panics under arbitrary byte inputs
//! - The pending buffer stays bounded by `MAX_PENDING_BYTES`
//! - Chunked and one-shot feeding yield the same lines
//!
//! cargo fuzz run fuzz_line_assembler

#![no_main]

use libfuzzer_sys::fuzz_target;
use tofstream::analysis::LineAssembler;
use tofstream::analysis::line_assembler::MAX_PENDING_BYTES;

fuzz_target!(|data: &[u8]| {
    let Some((&first, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(first % 32) + 1;

    let mut whole = LineAssembler::new();
    let expected = whole.push(stream);

    let mut split = LineAssembler::new();
    let mut got = Vec::new();
    for c in stream.chunks(chunk) {
        got.extend(split.push(c));
        assert!(split.pending_len() <= MAX_PENDING_BYTES);
    }

    assert_eq!(got, expected);
    assert_eq!(split.dropped(), whole.dropped());
});
