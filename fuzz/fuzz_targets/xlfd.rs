#![no_main]
use libfuzzer_sys::fuzz_target;
use weave_core::Xlfd;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = Xlfd::parse(s);
    }
});
