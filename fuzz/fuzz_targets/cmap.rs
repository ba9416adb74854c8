#![no_main]
use libfuzzer_sys::fuzz_target;
use weave_core::font::cmap::load_cmap;

fuzz_target!(|data: &[u8]| {
    if let Ok(Some(coverage)) = load_cmap(data) {
        for segment in &coverage.segments {
            assert!(segment.start <= segment.end);
        }
    }
});
