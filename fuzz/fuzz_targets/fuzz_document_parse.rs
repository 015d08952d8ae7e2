//! Fuzz target for structured document parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pp_core::codec::document;

fuzz_target!(|data: &[u8]| {
    if let Ok(summary) = document::from_slice(data) {
        let again = document::from_str(&document::to_string(&summary))
            .expect("emitted document must parse");
        assert_eq!(again, summary);
    }
});
