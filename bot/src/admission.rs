//! Join admission.
//!
//! Every joiner is quarantined before anything else is looked at, so a
//! store outage leaves new members restricted rather than free.

use std::sync::Arc;

use kahukura_platform::{AuditLog, Membership, Notifier};
use kahukura_store::IdentityStore;
use kahukura_types::{Actor, Clock, MemberId, ModerationAction, ModerationLogEntry, VerificationRecord};

use crate::notify::{deliver_with_fallback, Delivery};
use crate::{BotError, BotMetrics, Messages, MAX_WRITE_ATTEMPTS};

pub const BANNED_ON_JOIN_REASON: &str = "Rejoined while banned from verification.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Left in quarantine and told how to verify.
    Quarantined { created: bool, instructions: Delivery },
    /// Already verified: quarantine lifted.
    Cleared,
    /// Banned record: removed from the community on sight.
    Refused { removed: bool },
}

pub struct AdmissionController {
    identity: Arc<dyn IdentityStore>,
    membership: Arc<dyn Membership>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
    messages: Arc<Messages>,
    metrics: Arc<BotMetrics>,
}

impl AdmissionController {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        membership: Arc<dyn Membership>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
        messages: Arc<Messages>,
        metrics: Arc<BotMetrics>,
    ) -> Self {
        Self {
            identity,
            membership,
            notifier,
            audit,
            clock,
            messages,
            metrics,
        }
    }

    pub async fn on_member_joined(&self, member: &MemberId) -> Result<AdmissionOutcome, BotError> {
        self.metrics.joins.inc();
        if let Err(e) = self.membership.add_restriction(member).await {
            tracing::warn!(member = %member, error = %e, "failed to quarantine joining member");
        }

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let record = match self.identity.get(member)? {
                Some(record) => record,
                None => match self.identity.upsert(&VerificationRecord::new(member.clone())) {
                    Ok(_) => {
                        self.metrics.records.inc();
                        tracing::info!(member = %member, "new member quarantined");
                        let instructions = self.send_instructions(member).await;
                        return Ok(AdmissionOutcome::Quarantined {
                            created: true,
                            instructions,
                        });
                    }
                    // Someone else created it first; look again.
                    Err(e) if e.is_conflict() => continue,
                    Err(e) => return Err(e.into()),
                },
            };
            return Ok(self.admit_existing(member, &record).await);
        }
        Err(BotError::WriteContention(member.clone()))
    }

    async fn admit_existing(&self, member: &MemberId, record: &VerificationRecord) -> AdmissionOutcome {
        if record.banned {
            let _ = self
                .notifier
                .send_direct(member, &self.messages.banned_on_join())
                .await;
            let removed = match self.membership.ban(member, BANNED_ON_JOIN_REASON).await {
                Ok(()) => {
                    self.audit
                        .record_moderation_action(ModerationLogEntry::new(
                            ModerationAction::Ban,
                            member.clone(),
                            Actor::System,
                            BANNED_ON_JOIN_REASON,
                            self.clock.now(),
                        ))
                        .await;
                    true
                }
                Err(e) => {
                    tracing::error!(member = %member, error = %e, "failed to remove banned member on join");
                    false
                }
            };
            tracing::info!(member = %member, removed, "banned member refused on join");
            return AdmissionOutcome::Refused { removed };
        }

        if record.verified {
            if let Err(e) = self.membership.remove_restriction(member).await {
                tracing::warn!(member = %member, error = %e, "failed to lift quarantine for verified member");
            }
            tracing::info!(member = %member, "verified member rejoined");
            return AdmissionOutcome::Cleared;
        }

        let instructions = self.send_instructions(member).await;
        AdmissionOutcome::Quarantined {
            created: false,
            instructions,
        }
    }

    async fn send_instructions(&self, member: &MemberId) -> Delivery {
        let delivery = deliver_with_fallback(
            self.notifier.as_ref(),
            member,
            &self.messages.verification_instructions(),
            &self.messages.verification_instructions_fallback(member),
        )
        .await;
        if delivery == Delivery::Failed {
            self.metrics.notification_failures.inc();
        }
        delivery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kahukura_nullables::{MembershipCall, NullAuditLog, NullClock, NullIdentityStore, NullMembership, NullNotifier};

    struct Fixture {
        identity: Arc<NullIdentityStore>,
        membership: Arc<NullMembership>,
        notifier: Arc<NullNotifier>,
        controller: AdmissionController,
    }

    fn fixture() -> Fixture {
        let identity = Arc::new(NullIdentityStore::new());
        let membership = Arc::new(NullMembership::new());
        let notifier = Arc::new(NullNotifier::new());
        let controller = AdmissionController::new(
            identity.clone(),
            membership.clone(),
            notifier.clone(),
            Arc::new(NullAuditLog::new()),
            Arc::new(NullClock::new(0)),
            Arc::new(Messages::new("/verify", &["uni.edu".to_string()])),
            Arc::new(BotMetrics::new()),
        );
        Fixture {
            identity,
            membership,
            notifier,
            controller,
        }
    }

    fn member(id: &str) -> MemberId {
        MemberId::new(id).unwrap()
    }

    #[tokio::test]
    async fn new_member_gets_record_and_instructions() {
        let fx = fixture();
        fx.membership.join(&member("1"));
        let outcome = fx.controller.on_member_joined(&member("1")).await.unwrap();
        assert_eq!(
            outcome,
            AdmissionOutcome::Quarantined {
                created: true,
                instructions: Delivery::Direct
            }
        );
        assert!(fx.membership.is_restricted(&member("1")));
        assert!(fx.identity.get(&member("1")).unwrap().is_some());
        assert_eq!(fx.notifier.direct_to(&member("1")).len(), 1);
    }

    #[tokio::test]
    async fn quarantine_happens_before_lookup() {
        let fx = fixture();
        fx.membership.join(&member("1"));
        fx.identity.set_unavailable(true);
        assert!(fx.controller.on_member_joined(&member("1")).await.is_err());
        assert!(fx.membership.is_restricted(&member("1")));
    }

    #[tokio::test]
    async fn verified_member_is_cleared() {
        let fx = fixture();
        let mut record = VerificationRecord::new(member("1"));
        record.verified = true;
        fx.identity.insert(record);
        fx.membership.join(&member("1"));

        let outcome = fx.controller.on_member_joined(&member("1")).await.unwrap();
        assert_eq!(outcome, AdmissionOutcome::Cleared);
        assert!(!fx.membership.is_restricted(&member("1")));
        assert_eq!(
            fx.membership.calls(),
            vec![
                MembershipCall::AddRestriction(member("1")),
                MembershipCall::RemoveRestriction(member("1")),
            ]
        );
    }

    #[tokio::test]
    async fn unverified_member_falls_back_to_channel() {
        let fx = fixture();
        fx.identity.insert(VerificationRecord::new(member("1")));
        fx.membership.join(&member("1"));
        fx.notifier.disable_dms_for(&member("1"));

        let outcome = fx.controller.on_member_joined(&member("1")).await.unwrap();
        assert_eq!(
            outcome,
            AdmissionOutcome::Quarantined {
                created: false,
                instructions: Delivery::FallbackChannel
            }
        );
        assert!(fx.notifier.fallback_posts()[0].contains("<@1>"));
    }

    #[tokio::test]
    async fn banned_record_is_removed_even_if_verified() {
        let fx = fixture();
        let mut record = VerificationRecord::new(member("1"));
        record.verified = true;
        record.banned = true;
        fx.identity.insert(record);
        fx.membership.join(&member("1"));

        let outcome = fx.controller.on_member_joined(&member("1")).await.unwrap();
        assert_eq!(outcome, AdmissionOutcome::Refused { removed: true });
        assert!(!fx.membership.contains(&member("1")));
        assert!(fx.membership.is_banned(&member("1")));
    }
}
