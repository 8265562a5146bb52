//! Fuzz target for date normalization and date matching.
//!
//! Regex-based date detection and calendar construction must not panic on
//! pathological input, including out-of-range serials and quarters.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ledgerlens::inference::match_date;
use ledgerlens::normalize::{excel_serial_to_date, parse_date_str};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1_000 {
        return;
    }

    if data.len() >= 8 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&data[..8]);
        let _ = excel_serial_to_date(i64::from_le_bytes(bytes));
    }

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_date_str(s.trim());
        let _ = match_date(s.trim());
    }
});
