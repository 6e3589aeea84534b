//! Fuzz target: `ReplyDecoder::feed`
//!
//! Drives arbitrary byte sequences into the DFPlayer reply decoder, split
//! at an input-chosen point, and asserts that it never panics, never
//! yields more replies than whole frames fit in the input, and decodes the
//! same stream identically after a reset.
//!
//! cargo fuzz run fuzz_reply_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use propctl::drivers::dfplayer::{FRAME_LEN, ReplyDecoder};

fuzz_target!(|data: &[u8]| {
    let Some((&split, stream)) = data.split_first() else {
        return;
    };
    let at = usize::from(split).min(stream.len());

    let mut decoder = ReplyDecoder::new();
    let mut chunked = Vec::new();
    decoder.feed(&stream[..at], |r| chunked.push(r));
    decoder.feed(&stream[at..], |r| chunked.push(r));
    assert!(chunked.len() <= stream.len() / FRAME_LEN);

    // Chunking must not change what is decoded.
    let mut whole = Vec::new();
    decoder.reset();
    decoder.feed(stream, |r| whole.push(r));
    assert_eq!(chunked, whole);
});
