//! Fuzz target: `SessionRecord::parse`
//!
//! Feeds arbitrary text to the session-file parser.  Anything that parses
//! must render and parse again to the same record.
//!
//! cargo fuzz run fuzz_session_record

#![no_main]

use libfuzzer_sys::fuzz_target;
use tofstream::analysis::SessionRecord;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(record) = SessionRecord::parse(text) else {
        return;
    };

    let again = SessionRecord::parse(&record.render()).expect("rendered record parses");
    assert_eq!(again.samples.len(), record.samples.len());
    assert_eq!(
        again.header.last_averaged_distance_mm.is_some(),
        record.header.last_averaged_distance_mm.is_some()
    );
});
