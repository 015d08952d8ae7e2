//! Fuzz target for the binary stream decoder.
//!
//! Arbitrary bytes must decode or fail cleanly; anything that decodes must
//! survive a re-encode.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pp_core::codec::stream;

fuzz_target!(|data: &[u8]| {
    if let Ok(summary) = stream::decode(data) {
        let bytes = stream::encode(&summary).expect("decoded summary must encode");
        assert_eq!(stream::decode(&bytes).expect("re-encoded summary must decode"), summary);
    }
});
