//! Nullable code source: deterministic verification codes.

use std::sync::Mutex;

use kahukura_verification::CodeSource;

/// Returns pre-configured codes in order, cycling when exhausted.
pub struct NullCodeSource {
    codes: Vec<u32>,
    index: Mutex<usize>,
}

impl NullCodeSource {
    /// Create with a sequence of codes. An empty sequence yields `123456`.
    pub fn new(codes: Vec<u32>) -> Self {
        let codes = if codes.is_empty() { vec![123_456] } else { codes };
        Self {
            codes,
            index: Mutex::new(0),
        }
    }

    /// Create with a single code that will be returned for every call.
    pub fn constant(code: u32) -> Self {
        Self::new(vec![code])
    }
}

impl CodeSource for NullCodeSource {
    fn next_code(&self) -> u32 {
        let mut idx = self.index.lock().unwrap();
        let code = self.codes[*idx % self.codes.len()];
        *idx += 1;
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_codes() {
        let source = NullCodeSource::new(vec![111_111, 222_222]);
        assert_eq!(source.next_code(), 111_111);
        assert_eq!(source.next_code(), 222_222);
        assert_eq!(source.next_code(), 111_111);
    }
}
