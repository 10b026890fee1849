//! Verification state machine driver.
//!
//! Each operation reads the member's record, asks the transition table what
//! to do, and commits the result with an optimistic revision check. A
//! conflicting concurrent write makes the operation re-read and decide
//! again. Side effects run only after the commit, so a failed eviction or
//! undelivered mail never rolls back a committed record.

use std::sync::Arc;

use kahukura_platform::{AuditLog, Membership, Notifier};
use kahukura_store::IdentityStore;
use kahukura_types::{
    Actor, Clock, Email, MemberId, ModerationAction, ModerationLogEntry, VerificationRecord,
};
use kahukura_verification::{
    decide, owned_by_banned_member, parse_code, Decision, Effect, Rejection, Transition,
    TransitionKind, Trigger,
};

use crate::conflict::{ConflictResolver, SweepReport};
use crate::issuer::CodeIssuer;
use crate::{BotError, BotMetrics, Messages, Rules, MAX_WRITE_ATTEMPTS};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    InvalidEmail,
    Rejected(Rejection),
    /// The email is verified to a banned member; the requester is now banned too.
    BannedForEvasion,
    /// The code is stored. `delivered` is false when mail failed.
    CodeIssued { delivered: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Not six digits.
    InvalidCode,
    Rejected(Rejection),
    Verified { sweep: SweepReport },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManualVerifyOutcome {
    InvalidEmail,
    Rejected(Rejection),
    Verified {
        previous_email: Option<Email>,
        sweep: SweepReport,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BanSyncOutcome {
    Recorded,
    /// No record existed; a banned one was created.
    CreatedBanned,
    Unchanged,
    NoRecord,
}

enum Committed {
    Rejected(Rejection),
    Unchanged(VerificationRecord),
    Applied(Transition),
}

#[derive(Default)]
struct EffectsReport {
    delivered: Option<bool>,
    sweep: Option<SweepReport>,
}

pub struct VerificationMachine {
    identity: Arc<dyn IdentityStore>,
    membership: Arc<dyn Membership>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
    rules: Arc<Rules>,
    issuer: CodeIssuer,
    resolver: Arc<ConflictResolver>,
    messages: Arc<Messages>,
    metrics: Arc<BotMetrics>,
}

impl VerificationMachine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        membership: Arc<dyn Membership>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
        rules: Arc<Rules>,
        issuer: CodeIssuer,
        resolver: Arc<ConflictResolver>,
        messages: Arc<Messages>,
        metrics: Arc<BotMetrics>,
    ) -> Self {
        Self {
            identity,
            membership,
            notifier,
            audit,
            clock,
            rules,
            issuer,
            resolver,
            messages,
            metrics,
        }
    }

    /// Ask for a code to be mailed to `raw_email`.
    pub async fn request_verification(
        &self,
        member: &MemberId,
        raw_email: &str,
    ) -> Result<RequestOutcome, BotError> {
        let Ok(email) = Email::parse(raw_email) else {
            return Ok(RequestOutcome::InvalidEmail);
        };
        if !self.rules.policy.accepts(&email) {
            tracing::debug!(member = %member, email_domain = email.domain(), "email domain not accepted");
            return Ok(RequestOutcome::Rejected(Rejection::DomainNotAccepted));
        }

        let committed = self.commit(member, |record| {
            let held_by_banned =
                owned_by_banned_member(&self.identity.get_many_by_email_excluding(&email, member)?);
            Ok(decide(
                record,
                Trigger::RequestVerification {
                    email: email.clone(),
                    held_by_banned,
                    code: self.issuer.draw(),
                },
                self.rules.at(self.clock.now()),
            ))
        })?;

        match committed {
            Committed::Rejected(rejection) => {
                tracing::debug!(member = %member, ?rejection, "verification request refused");
                Ok(RequestOutcome::Rejected(rejection))
            }
            Committed::Unchanged(_) => Ok(RequestOutcome::Rejected(Rejection::AlreadyVerified)),
            Committed::Applied(t) => {
                let kind = t.kind;
                let report = self.perform(member, t.effects).await;
                if kind == TransitionKind::BannedForEvasion {
                    tracing::warn!(member = %member, email_domain = email.domain(), "banned for claiming a banned member's email");
                    return Ok(RequestOutcome::BannedForEvasion);
                }
                Ok(RequestOutcome::CodeIssued {
                    delivered: report.delivered.unwrap_or(false),
                })
            }
        }
    }

    /// Confirm a code previously mailed to the member.
    pub async fn submit_code(
        &self,
        member: &MemberId,
        raw_code: &str,
    ) -> Result<SubmitOutcome, BotError> {
        let Some(code) = parse_code(raw_code) else {
            return Ok(SubmitOutcome::InvalidCode);
        };

        let committed = self.commit(member, |record| {
            Ok(decide(
                record,
                Trigger::SubmitCode { code },
                self.rules.at(self.clock.now()),
            ))
        })?;

        match committed {
            Committed::Rejected(rejection) => {
                tracing::debug!(member = %member, ?rejection, "code submission refused");
                Ok(SubmitOutcome::Rejected(rejection))
            }
            Committed::Unchanged(_) => Ok(SubmitOutcome::Rejected(Rejection::NoPendingCode)),
            Committed::Applied(t) => {
                self.metrics.verifications.inc();
                tracing::info!(member = %member, "member verified by email code");
                let report = self.perform(member, t.effects).await;
                Ok(SubmitOutcome::Verified {
                    sweep: report.sweep.unwrap_or_default(),
                })
            }
        }
    }

    /// Administrator bypass of the code flow. Authorization is the caller's job.
    pub async fn manual_verify(
        &self,
        target: &MemberId,
        raw_email: &str,
        reason: &str,
        executor: &MemberId,
    ) -> Result<ManualVerifyOutcome, BotError> {
        let Ok(email) = Email::parse(raw_email) else {
            return Ok(ManualVerifyOutcome::InvalidEmail);
        };

        let committed = self.commit(target, |record| {
            Ok(decide(
                record,
                Trigger::ManualVerify {
                    email: email.clone(),
                    reason: reason.to_string(),
                    executor: executor.clone(),
                },
                self.rules.at(self.clock.now()),
            ))
        })?;

        match committed {
            Committed::Applied(t) => {
                self.metrics.manual_verifications.inc();
                tracing::info!(member = %target, executor = %executor, "member manually verified");
                let previous_email = t.record.previous_email.clone();
                let report = self.perform(target, t.effects).await;
                Ok(ManualVerifyOutcome::Verified {
                    previous_email,
                    sweep: report.sweep.unwrap_or_default(),
                })
            }
            Committed::Unchanged(record) => Ok(ManualVerifyOutcome::Verified {
                previous_email: record.previous_email,
                sweep: SweepReport::default(),
            }),
            Committed::Rejected(rejection) => Ok(ManualVerifyOutcome::Rejected(rejection)),
        }
    }

    /// The platform reported a ban. Absent records are created banned, so a
    /// later join is refused.
    pub async fn on_platform_ban(&self, member: &MemberId) -> Result<BanSyncOutcome, BotError> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(record) = self.identity.get(member)? else {
                let mut record = VerificationRecord::new(member.clone());
                record.banned = true;
                match self.identity.upsert(&record) {
                    Ok(_) => {
                        self.metrics.records.inc();
                        tracing::info!(member = %member, "ban recorded for member without a record");
                        return Ok(BanSyncOutcome::CreatedBanned);
                    }
                    Err(e) if e.is_conflict() => continue,
                    Err(e) => return Err(e.into()),
                }
            };
            match decide(&record, Trigger::PlatformBan, self.rules.at(self.clock.now())) {
                Decision::Apply(_) => {
                    if self.identity.set_banned(member, true)? {
                        tracing::info!(member = %member, "ban recorded");
                        return Ok(BanSyncOutcome::Recorded);
                    }
                    // Deleted in between; start over.
                }
                Decision::Unchanged | Decision::Reject(_) => return Ok(BanSyncOutcome::Unchanged),
            }
        }
        Err(BotError::WriteContention(member.clone()))
    }

    /// The platform reported an unban. Absent records are left absent.
    pub async fn on_platform_unban(&self, member: &MemberId) -> Result<BanSyncOutcome, BotError> {
        let Some(record) = self.identity.get(member)? else {
            return Ok(BanSyncOutcome::NoRecord);
        };
        match decide(&record, Trigger::PlatformUnban, self.rules.at(self.clock.now())) {
            Decision::Apply(_) => {
                if self.identity.set_banned(member, false)? {
                    tracing::info!(member = %member, "unban recorded");
                    Ok(BanSyncOutcome::Recorded)
                } else {
                    Ok(BanSyncOutcome::NoRecord)
                }
            }
            Decision::Unchanged | Decision::Reject(_) => Ok(BanSyncOutcome::Unchanged),
        }
    }

    /// Read, decide, and write with a revision check, retrying on conflict.
    fn commit<F>(&self, member: &MemberId, mut decide_for: F) -> Result<Committed, BotError>
    where
        F: FnMut(&VerificationRecord) -> Result<Decision, BotError>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self
                .identity
                .get(member)?
                .unwrap_or_else(|| VerificationRecord::new(member.clone()));
            let transition = match decide_for(&current)? {
                Decision::Reject(rejection) => return Ok(Committed::Rejected(rejection)),
                Decision::Unchanged => return Ok(Committed::Unchanged(current)),
                Decision::Apply(t) => t,
            };
            match self.identity.upsert(&transition.record) {
                Ok(stored) => {
                    if stored.revision == 1 {
                        self.metrics.records.inc();
                    }
                    return Ok(Committed::Applied(Transition {
                        record: stored,
                        ..transition
                    }));
                }
                Err(e) if e.is_conflict() => {
                    tracing::debug!(member = %member, attempt, "concurrent write, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(BotError::WriteContention(member.clone()))
    }

    async fn perform(&self, member: &MemberId, effects: Vec<Effect>) -> EffectsReport {
        let mut report = EffectsReport::default();
        for effect in effects {
            match effect {
                Effect::DeliverCode { email, code } => {
                    report.delivered = Some(self.issuer.deliver(member, &email, code).await);
                }
                Effect::ResolveConflicts { email } => {
                    report.sweep = Some(self.resolver.resolve(member, &email).await);
                }
                Effect::LiftQuarantine => {
                    if let Err(e) = self.membership.remove_restriction(member).await {
                        tracing::warn!(member = %member, error = %e, "failed to lift quarantine");
                    }
                }
                Effect::BanFromCommunity { reason } => {
                    let _ = self
                        .notifier
                        .send_direct(member, &self.messages.banned_for_evasion())
                        .await;
                    match self.membership.ban(member, &reason).await {
                        Ok(()) => {
                            self.audit
                                .record_moderation_action(ModerationLogEntry::new(
                                    ModerationAction::Ban,
                                    member.clone(),
                                    Actor::System,
                                    reason,
                                    self.clock.now(),
                                ))
                                .await;
                        }
                        Err(e) => {
                            tracing::error!(member = %member, error = %e, "failed to ban member from community");
                        }
                    }
                }
                Effect::EvictIfMember { reason } => {
                    let sweep = report.sweep.get_or_insert_with(SweepReport::default);
                    self.resolver.evict_if_member(member, &reason, sweep).await;
                }
            }
        }
        report
    }
}
