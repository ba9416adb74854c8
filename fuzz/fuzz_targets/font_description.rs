#![no_main]
use libfuzzer_sys::fuzz_target;
use weave_core::parse_font_description;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok((attrs, _)) = parse_font_description(s) {
            let _ = attrs.to_string();
        }
    }
});
