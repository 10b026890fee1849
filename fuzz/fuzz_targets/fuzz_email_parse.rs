#![no_main]

use kahukura_types::Email;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(email) = Email::parse(raw) {
        // Normalization is idempotent.
        let again = Email::parse(email.as_str()).unwrap();
        assert_eq!(email, again);
        assert!(!email.domain().is_empty());
    }
});
