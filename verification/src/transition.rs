//! The verification transition table.
//!
//! | From | Trigger | Guard | To |
//! |---|---|---|---|
//! | Unverified / PendingCode | request | domain accepted, email not verified by a banned owner | PendingCode |
//! | Unverified / PendingCode | request | email verified by a banned owner | banned |
//! | PendingCode | submit | code matches, not expired | Verified |
//! | any | manual verify | caller authorized (checked upstream) | Verified |
//! | any | platform ban | | `banned = true` |
//! | banned | platform unban | | `banned = false` |
//! | any | conflict revoke | not the winning claimant | `verified = false`, evicted |
//!
//! [`decide`] never mutates its input. The caller writes the returned record
//! and then performs the [`Effect`]s in order.

use kahukura_types::{Email, ManualOverride, MemberId, Timestamp, VerificationRecord};

use crate::code::{pending_code, validate_code, CodeCheck};
use crate::{DomainPolicy, VerificationParams};

/// Something that may move a record to a new state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// The member asks for a code to be sent to `email`.
    RequestVerification {
        email: Email,
        /// Whether `email` is verified to another member who is banned.
        /// See [`owned_by_banned_member`].
        held_by_banned: bool,
        /// The code to issue if the request is accepted.
        code: u32,
    },
    SubmitCode { code: u32 },
    ManualVerify {
        email: Email,
        reason: String,
        executor: MemberId,
    },
    PlatformBan,
    PlatformUnban,
    /// Another member won the claim on this record's email.
    ConflictRevoke { winner: MemberId },
}

/// Static inputs every decision needs.
#[derive(Clone, Copy, Debug)]
pub struct DecisionContext<'a> {
    pub policy: &'a DomainPolicy,
    pub params: &'a VerificationParams,
    pub now: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Apply(Transition),
    /// The trigger is legal but nothing changes.
    Unchanged,
    /// A normal, user-facing refusal. No state change.
    Reject(Rejection),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub kind: TransitionKind,
    /// The record to write. Its revision is the one it was decided from.
    pub record: VerificationRecord,
    pub effects: Vec<Effect>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionKind {
    CodeIssued,
    BannedForEvasion,
    Verified,
    ManuallyVerified,
    Banned,
    Unbanned,
    Revoked,
}

/// Side effects owed once the new record is committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    DeliverCode { email: Email, code: u32 },
    BanFromCommunity { reason: String },
    /// Revoke every other record claiming `email`.
    ResolveConflicts { email: Email },
    LiftQuarantine,
    EvictIfMember { reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    DomainNotAccepted,
    Banned,
    AlreadyVerified,
    Throttled { retry_after_secs: u64 },
    NoPendingCode,
    CodeMismatch,
    CodeExpired,
}

pub const BAN_EVASION_REASON: &str =
    "Ban evasion: the verification email belongs to a banned member.";

pub fn revocation_reason(winner: &MemberId) -> String {
    format!(
        "User verification revoked due to another user (ID: {winner}) verifying with the same email."
    )
}

/// Whether any of `others` verified the email and is banned.
///
/// Unconfirmed claims never count: a banned member who only asked for a
/// code does not own the address.
pub fn owned_by_banned_member(others: &[VerificationRecord]) -> bool {
    others.iter().any(|other| other.verified && other.banned)
}

/// Decide what `trigger` does to `record`.
pub fn decide(record: &VerificationRecord, trigger: Trigger, ctx: DecisionContext<'_>) -> Decision {
    match trigger {
        Trigger::RequestVerification {
            email,
            held_by_banned,
            code,
        } => request(record, email, held_by_banned, code, ctx),
        Trigger::SubmitCode { code } => submit(record, code, ctx.now),
        Trigger::ManualVerify {
            email,
            reason,
            executor,
        } => manual_verify(record, email, reason, executor, ctx.now),
        Trigger::PlatformBan => {
            if record.banned {
                return Decision::Unchanged;
            }
            let mut next = record.clone();
            next.banned = true;
            apply(TransitionKind::Banned, next, Vec::new())
        }
        Trigger::PlatformUnban => {
            if !record.banned {
                return Decision::Unchanged;
            }
            let mut next = record.clone();
            next.banned = false;
            apply(TransitionKind::Unbanned, next, Vec::new())
        }
        Trigger::ConflictRevoke { winner } => {
            if record.member_id == winner {
                return Decision::Unchanged;
            }
            let mut next = record.clone();
            next.verified = false;
            apply(
                TransitionKind::Revoked,
                next,
                vec![Effect::EvictIfMember {
                    reason: revocation_reason(&winner),
                }],
            )
        }
    }
}

fn apply(kind: TransitionKind, record: VerificationRecord, effects: Vec<Effect>) -> Decision {
    Decision::Apply(Transition {
        kind,
        record,
        effects,
    })
}

fn request(
    record: &VerificationRecord,
    email: Email,
    held_by_banned: bool,
    code: u32,
    ctx: DecisionContext<'_>,
) -> Decision {
    if !ctx.policy.accepts(&email) {
        return Decision::Reject(Rejection::DomainNotAccepted);
    }
    if record.banned {
        return Decision::Reject(Rejection::Banned);
    }
    // Changing a verified email goes through manual verification.
    if record.verified {
        return Decision::Reject(Rejection::AlreadyVerified);
    }
    if held_by_banned {
        let mut next = record.clone();
        next.banned = true;
        next.email = Some(email);
        next.pending_code = None;
        return apply(
            TransitionKind::BannedForEvasion,
            next,
            vec![Effect::BanFromCommunity {
                reason: BAN_EVASION_REASON.to_string(),
            }],
        );
    }

    let cooldown = ctx.params.resend_cooldown_secs;
    if cooldown > 0 {
        if let Some(pending) = record.pending_code.as_ref() {
            let ready_at = pending.last_attempt_at.plus_secs(cooldown);
            if ctx.now < ready_at {
                return Decision::Reject(Rejection::Throttled {
                    retry_after_secs: ready_at.as_secs() - ctx.now.as_secs(),
                });
            }
        }
    }

    let mut next = record.clone();
    next.email = Some(email.clone());
    next.pending_code = Some(pending_code(code, ctx.now, ctx.params.code_ttl_secs));
    apply(
        TransitionKind::CodeIssued,
        next,
        vec![Effect::DeliverCode { email, code }],
    )
}

fn submit(record: &VerificationRecord, code: u32, now: Timestamp) -> Decision {
    let email = match (record.pending_code.as_ref(), record.email.as_ref()) {
        (Some(_), Some(email)) => email.clone(),
        _ if record.verified => return Decision::Reject(Rejection::AlreadyVerified),
        _ => return Decision::Reject(Rejection::NoPendingCode),
    };
    match validate_code(record.pending_code.as_ref(), code, now) {
        CodeCheck::Ok => {}
        CodeCheck::Mismatch => return Decision::Reject(Rejection::CodeMismatch),
        CodeCheck::Expired => return Decision::Reject(Rejection::CodeExpired),
        CodeCheck::NotIssued => return Decision::Reject(Rejection::NoPendingCode),
    }

    let mut next = record.clone();
    next.verified = true;
    next.pending_code = None;
    let mut effects = vec![Effect::ResolveConflicts { email }];
    if !next.banned {
        effects.push(Effect::LiftQuarantine);
    }
    apply(TransitionKind::Verified, next, effects)
}

fn manual_verify(
    record: &VerificationRecord,
    email: Email,
    reason: String,
    executor: MemberId,
    now: Timestamp,
) -> Decision {
    let mut next = record.clone();
    if let Some(old) = record.email.as_ref() {
        if *old != email {
            next.previous_email = Some(old.clone());
        }
    }
    next.email = Some(email.clone());
    next.verified = true;
    next.pending_code = None;
    next.manual_override = Some(ManualOverride {
        verified: true,
        reason,
        executor_id: executor,
        executed_at: now,
    });
    let mut effects = vec![Effect::ResolveConflicts { email }];
    if !next.banned {
        effects.push(Effect::LiftQuarantine);
    }
    apply(TransitionKind::ManuallyVerified, next, effects)
}
