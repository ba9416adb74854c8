#![no_main]
use libfuzzer_sys::fuzz_target;
use weave_core::dummy_backend::DummyBackend;
use weave_core::{EnvironmentConfig, FontEnvironment, MeasureFlags};

fuzz_target!(|data: &[u8]| {
    let Some((&first, rest)) = data.split_first() else {
        return;
    };
    let Ok(text) = std::str::from_utf8(rest) else {
        return;
    };

    let mut env = FontEnvironment::new(DummyBackend::standard(), EnvironmentConfig::default());
    let font = env.get_font("Helvetica 12").unwrap();
    let flags = MeasureFlags::from_bits_truncate(first);
    let max = if first & 0x80 != 0 { None } else { Some(first as i32) };

    let (bytes, _) = env.measure(font, text, max, flags).unwrap();
    assert!(text.is_char_boundary(bytes));
});
