//! Timing parameters for verification and data-rights flows.

use serde::{Deserialize, Serialize};

use crate::VerificationError;

/// Seconds a verification code stays valid.
pub const DEFAULT_CODE_TTL_SECS: u64 = 10 * 60;
/// Minimum gap between self-service data exports (7 days).
pub const DEFAULT_EXPORT_THROTTLE_SECS: u64 = 7 * 24 * 60 * 60;
/// How long a confirm/cancel prompt waits for an answer.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationParams {
    pub code_ttl_secs: u64,
    /// 0 disables the cooldown: a re-request always replaces the code.
    pub resend_cooldown_secs: u64,
    pub export_throttle_secs: u64,
    pub confirmation_timeout_secs: u64,
}

impl Default for VerificationParams {
    fn default() -> Self {
        Self {
            code_ttl_secs: DEFAULT_CODE_TTL_SECS,
            resend_cooldown_secs: 0,
            export_throttle_secs: DEFAULT_EXPORT_THROTTLE_SECS,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
        }
    }
}

impl VerificationParams {
    pub fn validate(&self) -> Result<(), VerificationError> {
        if self.code_ttl_secs == 0 {
            return Err(VerificationError::InvalidParameter {
                name: "code_ttl_secs",
                reason: "must be greater than zero".into(),
            });
        }
        if self.confirmation_timeout_secs == 0 {
            return Err(VerificationError::InvalidParameter {
                name: "confirmation_timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        if self.resend_cooldown_secs >= self.code_ttl_secs {
            return Err(VerificationError::InvalidParameter {
                name: "resend_cooldown_secs",
                reason: format!(
                    "must be shorter than the code lifetime ({}s)",
                    self.code_ttl_secs
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = VerificationParams::default();
        assert_eq!(params.code_ttl_secs, 600);
        assert_eq!(params.export_throttle_secs, 604_800);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn cooldown_must_be_shorter_than_ttl() {
        let params = VerificationParams {
            resend_cooldown_secs: 600,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(VerificationError::InvalidParameter { name: "resend_cooldown_secs", .. })
        ));
    }

    #[test]
    fn zero_ttl_rejected() {
        let params = VerificationParams {
            code_ttl_secs: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
