#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Some(code) = kahukura_verification::parse_code(raw) {
        assert!((kahukura_verification::CODE_MIN..=kahukura_verification::CODE_MAX).contains(&code));
    }
    let _ = kahukura_utils::parse_duration(raw);
});
