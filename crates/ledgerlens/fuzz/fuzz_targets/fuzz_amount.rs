//! Fuzz target for amount normalization.
//!
//! Checks that amount parsing and the classifier's number matcher:
//! 1. Never panic on any input
//! 2. Agree with themselves on repeated calls

#![no_main]

use libfuzzer_sys::fuzz_target;
use ledgerlens::inference::match_number;
use ledgerlens::normalize::{clean_number, parse_amount_str};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1_000 {
        return;
    }

    if let Ok(s) = std::str::from_utf8(data) {
        let first = parse_amount_str(s.trim());
        assert_eq!(first, parse_amount_str(s.trim()));

        let _ = clean_number(s);
        let _ = match_number(s);
    }
});
