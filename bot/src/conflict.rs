//! Email conflict sweep.
//!
//! Runs after a record has been committed as verified. Every other record
//! claiming the same email is revoked and its member evicted. The sweep is
//! best effort: each claimant is handled independently, failures are
//! logged and reported, and nothing is rolled back. Re-running a sweep for
//! the same winner is harmless.

use std::sync::Arc;

use kahukura_platform::{AuditLog, Membership};
use kahukura_store::IdentityStore;
use kahukura_types::{Actor, Clock, Email, MemberId, ModerationAction, ModerationLogEntry};
use kahukura_verification::{decide, Decision, Effect, Trigger};

use crate::{BotMetrics, Rules};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepStage {
    Lookup,
    Revoke,
    Evict,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepFailure {
    /// `None` when the claimant list itself could not be read.
    pub member: Option<MemberId>,
    pub stage: SweepStage,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub revoked: Vec<MemberId>,
    pub evicted: Vec<MemberId>,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ConflictResolver {
    identity: Arc<dyn IdentityStore>,
    membership: Arc<dyn Membership>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
    rules: Arc<Rules>,
    metrics: Arc<BotMetrics>,
}

impl ConflictResolver {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        membership: Arc<dyn Membership>,
        audit: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
        rules: Arc<Rules>,
        metrics: Arc<BotMetrics>,
    ) -> Self {
        Self {
            identity,
            membership,
            audit,
            clock,
            rules,
            metrics,
        }
    }

    /// Revoke and evict every claimant of `email` other than `winner`.
    pub async fn resolve(&self, winner: &MemberId, email: &Email) -> SweepReport {
        let mut report = SweepReport::default();

        let claimants = match self.identity.get_many_by_email_excluding(email, winner) {
            Ok(claimants) => claimants,
            Err(e) => {
                tracing::error!(winner = %winner, error = %e, "conflict sweep could not list claimants");
                report.failures.push(SweepFailure {
                    member: None,
                    stage: SweepStage::Lookup,
                    error: e.to_string(),
                });
                return report;
            }
        };

        for claimant in claimants {
            let loser = claimant.member_id.clone();
            let trigger = Trigger::ConflictRevoke {
                winner: winner.clone(),
            };
            let transition = match decide(&claimant, trigger, self.rules.at(self.clock.now())) {
                Decision::Apply(t) => t,
                Decision::Unchanged | Decision::Reject(_) => continue,
            };

            if claimant.verified {
                match self.identity.set_verified(&loser, false) {
                    Ok(true) => {
                        self.metrics.conflict_revocations.inc();
                        tracing::info!(winner = %winner, loser = %loser, "verification revoked by email conflict");
                        report.revoked.push(loser.clone());
                    }
                    // Deleted since the claimant list was read.
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(winner = %winner, loser = %loser, error = %e, "failed to revoke conflicting claimant");
                        report.failures.push(SweepFailure {
                            member: Some(loser.clone()),
                            stage: SweepStage::Revoke,
                            error: e.to_string(),
                        });
                    }
                }
            }

            for effect in transition.effects {
                if let Effect::EvictIfMember { reason } = effect {
                    self.evict_if_member(&loser, &reason, &mut report).await;
                }
            }
        }

        report
    }

    /// Evict `loser` if still present, auditing the kick.
    pub(crate) async fn evict_if_member(&self, loser: &MemberId, reason: &str, report: &mut SweepReport) {
        let outcome = match self.membership.is_member(loser).await {
            Ok(false) => return,
            Ok(true) => self.membership.evict(loser, reason).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => {
                report.evicted.push(loser.clone());
                self.audit
                    .record_moderation_action(ModerationLogEntry::new(
                        ModerationAction::Kick,
                        loser.clone(),
                        Actor::System,
                        reason,
                        self.clock.now(),
                    ))
                    .await;
            }
            Err(e) => {
                self.metrics.eviction_failures.inc();
                tracing::error!(member = %loser, error = %e, "failed to evict conflicting claimant");
                report.failures.push(SweepFailure {
                    member: Some(loser.clone()),
                    stage: SweepStage::Evict,
                    error: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kahukura_nullables::{NullAuditLog, NullClock, NullIdentityStore, NullMembership};
    use kahukura_types::VerificationRecord;
    use kahukura_verification::{DomainPolicy, VerificationParams};

    struct Fixture {
        identity: Arc<NullIdentityStore>,
        membership: Arc<NullMembership>,
        audit: Arc<NullAuditLog>,
        resolver: ConflictResolver,
    }

    fn fixture() -> Fixture {
        let identity = Arc::new(NullIdentityStore::new());
        let membership = Arc::new(NullMembership::new());
        let audit = Arc::new(NullAuditLog::new());
        let rules = Rules::new(
            DomainPolicy::new(["uni.edu"]).unwrap(),
            VerificationParams::default(),
        );
        let resolver = ConflictResolver::new(
            identity.clone(),
            membership.clone(),
            audit.clone(),
            Arc::new(NullClock::new(1_000)),
            Arc::new(rules),
            Arc::new(BotMetrics::new()),
        );
        Fixture {
            identity,
            membership,
            audit,
            resolver,
        }
    }

    fn member(id: &str) -> MemberId {
        MemberId::new(id).unwrap()
    }

    fn email() -> Email {
        Email::parse("a@uni.edu").unwrap()
    }

    fn claim(fx: &Fixture, id: &str, verified: bool) {
        let mut record = VerificationRecord::new(member(id));
        record.email = Some(email());
        record.verified = verified;
        fx.identity.insert(record);
    }

    #[tokio::test]
    async fn revokes_and_evicts_other_claimants() {
        let fx = fixture();
        claim(&fx, "1", true);
        claim(&fx, "2", true);
        fx.membership.join(&member("1"));

        let report = fx.resolver.resolve(&member("2"), &email()).await;
        assert!(report.is_clean());
        assert_eq!(report.revoked, vec![member("1")]);
        assert_eq!(report.evicted, vec![member("1")]);
        assert_eq!(fx.identity.verified_with_email(&email()), vec![member("2")]);
        assert!(fx.audit.entries()[0].reason.contains("(ID: 2)"));
    }

    #[tokio::test]
    async fn absent_claimant_is_not_evicted() {
        let fx = fixture();
        claim(&fx, "1", true);
        claim(&fx, "2", true);

        let report = fx.resolver.resolve(&member("2"), &email()).await;
        assert_eq!(report.revoked, vec![member("1")]);
        assert!(report.evicted.is_empty());
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn one_eviction_failure_does_not_stop_the_sweep() {
        let fx = fixture();
        for id in ["1", "2", "3"] {
            claim(&fx, id, true);
            fx.membership.join(&member(id));
        }
        fx.membership.fail_evictions_of(&member("1"));

        let report = fx.resolver.resolve(&member("3"), &email()).await;
        assert_eq!(report.revoked, vec![member("1"), member("2")]);
        assert_eq!(report.evicted, vec![member("2")]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, SweepStage::Evict);
        assert_eq!(report.failures[0].member, Some(member("1")));
        // The failed eviction does not undo the revocation.
        assert_eq!(fx.identity.verified_with_email(&email()), vec![member("3")]);
    }

    #[tokio::test]
    async fn eviction_checks_membership_first() {
        let fx = fixture();
        let mut report = SweepReport::default();
        fx.resolver.evict_if_member(&member("1"), "gone", &mut report).await;
        assert!(fx.membership.evictions().is_empty());
        assert!(report.evicted.is_empty() && report.is_clean());

        fx.membership.join(&member("1"));
        fx.resolver.evict_if_member(&member("1"), "gone", &mut report).await;
        assert_eq!(fx.membership.evictions(), vec![member("1")]);
        assert_eq!(report.evicted, vec![member("1")]);
        assert_eq!(fx.audit.entries()[0].action, ModerationAction::Kick);
    }

    #[tokio::test]
    async fn unverified_claimant_is_evicted_without_revision_bump() {
        let fx = fixture();
        claim(&fx, "1", false);
        claim(&fx, "2", true);
        fx.membership.join(&member("1"));
        let before = fx.identity.get(&member("1")).unwrap().unwrap().revision;

        let report = fx.resolver.resolve(&member("2"), &email()).await;
        assert!(report.revoked.is_empty());
        assert_eq!(report.evicted, vec![member("1")]);
        assert_eq!(
            fx.identity.get(&member("1")).unwrap().unwrap().revision,
            before
        );
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let fx = fixture();
        claim(&fx, "1", true);
        claim(&fx, "2", true);
        fx.membership.join(&member("1"));

        fx.resolver.resolve(&member("2"), &email()).await;
        let again = fx.resolver.resolve(&member("2"), &email()).await;
        assert!(again.revoked.is_empty());
        assert!(again.evicted.is_empty());
        assert!(again.is_clean());
    }

    #[tokio::test]
    async fn lookup_failure_is_reported() {
        let fx = fixture();
        fx.identity.set_unavailable(true);
        let report = fx.resolver.resolve(&member("2"), &email()).await;
        assert_eq!(report.failures[0].stage, SweepStage::Lookup);
    }
}
