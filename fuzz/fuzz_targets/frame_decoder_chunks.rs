#![no_main]

use breeze_ai::{DecoderConfig, FrameDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&split_hint, body)) = data.split_first() else {
        return;
    };
    let raw = String::from_utf8_lossy(body);
    let mut split = usize::from(split_hint) % (raw.len() + 1);
    while !raw.is_char_boundary(split) {
        split -= 1;
    }

    let mut whole = FrameDecoder::new(DecoderConfig::default());
    let Ok(expected) = whole.feed(&raw) else {
        return;
    };

    let mut chunked = FrameDecoder::new(DecoderConfig::default());
    let mut actual = match chunked.feed(&raw[..split]) {
        Ok(deltas) => deltas,
        Err(error) => panic!("prefix of a valid stream was rejected: {error}"),
    };
    match chunked.feed(&raw[split..]) {
        Ok(deltas) => actual.extend(deltas),
        Err(error) => panic!("suffix of a valid stream was rejected: {error}"),
    }

    assert_eq!(expected.concat(), actual.concat());
    assert_eq!(whole.buffered(), chunked.buffered());
});
