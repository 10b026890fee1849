//! Verification code issuance and delivery.

use std::sync::Arc;

use kahukura_platform::Mailer;
use kahukura_types::{Email, MemberId};
use kahukura_verification::CodeSource;

use crate::BotMetrics;

/// Draws codes and mails them.
///
/// Submissions are checked by `kahukura_verification::validate_code` inside
/// the transition table. Persisting the pending code is part of the verification transition, so
/// the issuer never writes to the store itself.
pub struct CodeIssuer {
    codes: Arc<dyn CodeSource>,
    mailer: Arc<dyn Mailer>,
    metrics: Arc<BotMetrics>,
}

impl CodeIssuer {
    pub fn new(codes: Arc<dyn CodeSource>, mailer: Arc<dyn Mailer>, metrics: Arc<BotMetrics>) -> Self {
        Self {
            codes,
            mailer,
            metrics,
        }
    }

    pub fn draw(&self) -> u32 {
        self.codes.next_code()
    }

    /// Mail a stored code. Returns whether the mailer accepted it; a failure
    /// leaves the stored code valid.
    pub async fn deliver(&self, member: &MemberId, email: &Email, code: u32) -> bool {
        self.metrics.codes_issued.inc();
        match self.mailer.send_code(email, code).await {
            Ok(()) => {
                tracing::info!(member = %member, email_domain = email.domain(), "verification code sent");
                true
            }
            Err(e) => {
                self.metrics.code_deliveries_failed.inc();
                tracing::warn!(
                    member = %member,
                    email_domain = email.domain(),
                    error = %e,
                    "verification code stored but not delivered"
                );
                false
            }
        }
    }
}
