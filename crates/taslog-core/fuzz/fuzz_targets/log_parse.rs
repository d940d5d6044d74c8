#![no_main]
use libfuzzer_sys::fuzz_target;
use taslog_core::{read_slice, writer};

fuzz_target!(|data: &[u8]| {
    // Anything the reader accepts must survive a rewrite unchanged.
    if let Ok(log) = read_slice(data) {
        if let Ok(text) = writer::to_string(&log) {
            let again = read_slice(text.as_bytes()).expect("rewritten log must parse");
            assert_eq!(again, log);
        }
    }
});
