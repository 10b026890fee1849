//! Six-digit verification codes.

use kahukura_types::{PendingCode, Timestamp};
use rand::Rng;

pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;

/// Source of fresh verification codes.
pub trait CodeSource: Send + Sync {
    /// A code in `CODE_MIN..=CODE_MAX`.
    fn next_code(&self) -> u32;
}

/// Uniform codes from the thread-local CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomCodeSource;

impl CodeSource for RandomCodeSource {
    fn next_code(&self) -> u32 {
        rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX)
    }
}

/// Result of comparing a submitted code with the stored one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeCheck {
    Ok,
    Expired,
    Mismatch,
    /// No code has been issued, or it was already consumed.
    NotIssued,
}

/// A pending code issued at `now`, valid for `ttl_secs`.
pub fn pending_code(code: u32, now: Timestamp, ttl_secs: u64) -> PendingCode {
    PendingCode {
        code,
        expires_at: now.plus_secs(ttl_secs),
        last_attempt_at: now,
    }
}

/// Compare `submitted` against `pending` without mutating anything.
///
/// A wrong code reports a mismatch even once the code has expired. A correct
/// code submitted at or after `expires_at` is expired.
pub fn validate_code(pending: Option<&PendingCode>, submitted: u32, now: Timestamp) -> CodeCheck {
    let Some(pending) = pending else {
        return CodeCheck::NotIssued;
    };
    if pending.code != submitted {
        return CodeCheck::Mismatch;
    }
    if now >= pending.expires_at {
        return CodeCheck::Expired;
    }
    CodeCheck::Ok
}

/// Parse user input into a code. Anything other than exactly six ASCII
/// digits in range is rejected.
pub fn parse_code(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>()
        .ok()
        .filter(|code| (CODE_MIN..=CODE_MAX).contains(code))
}
