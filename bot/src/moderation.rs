//! Moderation actions and their audit trail.
//!
//! Every action goes to the platform first. Only an accepted action is
//! written to the audit log, and a refused one is reported back to the
//! moderator as an outcome, never as an error.

use std::sync::Arc;

use kahukura_platform::{AuditLog, Membership, Notifier, PlatformError};
use kahukura_store::{ModerationLogStore, StoredModerationEntry};
use kahukura_types::{Actor, Clock, MemberId, ModerationAction, ModerationLogEntry};
use kahukura_utils::parse_duration;

use crate::machine::VerificationMachine;
use crate::{BotError, Messages};

/// Longest timeout the platform allows.
pub const MAX_TIMEOUT_SECS: u64 = 28 * 24 * 60 * 60;
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const MAX_HISTORY_LIMIT: usize = 25;
pub const DEFAULT_REASON: &str = "No reason provided";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModerationOutcome {
    Done,
    /// A timeout was applied for this many seconds.
    TimedOut { duration_secs: u64 },
    Warned { notified: bool },
    InvalidDuration,
    /// The platform refused the action; nothing was logged.
    Refused(String),
}

pub struct ModerationService {
    membership: Arc<dyn Membership>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditLog>,
    log: Arc<dyn ModerationLogStore>,
    machine: Arc<VerificationMachine>,
    clock: Arc<dyn Clock>,
    messages: Arc<Messages>,
}

impl ModerationService {
    pub fn new(
        membership: Arc<dyn Membership>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditLog>,
        log: Arc<dyn ModerationLogStore>,
        machine: Arc<VerificationMachine>,
        clock: Arc<dyn Clock>,
        messages: Arc<Messages>,
    ) -> Self {
        Self {
            membership,
            notifier,
            audit,
            log,
            machine,
            clock,
            messages,
        }
    }

    pub async fn ban(
        &self,
        target: &MemberId,
        reason: &str,
        moderator: &MemberId,
    ) -> Result<ModerationOutcome, BotError> {
        if let Err(e) = self.membership.ban(target, reason).await {
            return Ok(refused(target, ModerationAction::Ban, e));
        }
        self.machine.on_platform_ban(target).await?;
        self.record(ModerationAction::Ban, target, moderator, reason, None).await;
        Ok(ModerationOutcome::Done)
    }

    pub async fn unban(
        &self,
        target: &MemberId,
        reason: &str,
        moderator: &MemberId,
    ) -> Result<ModerationOutcome, BotError> {
        if let Err(e) = self.membership.unban(target, reason).await {
            return Ok(refused(target, ModerationAction::Unban, e));
        }
        self.machine.on_platform_unban(target).await?;
        self.record(ModerationAction::Unban, target, moderator, reason, None).await;
        Ok(ModerationOutcome::Done)
    }

    pub async fn kick(
        &self,
        target: &MemberId,
        reason: &str,
        moderator: &MemberId,
    ) -> ModerationOutcome {
        if let Err(e) = self.membership.evict(target, reason).await {
            return refused(target, ModerationAction::Kick, e);
        }
        self.record(ModerationAction::Kick, target, moderator, reason, None).await;
        ModerationOutcome::Done
    }

    /// `duration` is `"90"` (minutes) or a unit form such as `"1d12h"`.
    pub async fn timeout(
        &self,
        target: &MemberId,
        duration: &str,
        reason: &str,
        moderator: &MemberId,
    ) -> ModerationOutcome {
        let duration_secs = match parse_duration(duration) {
            Ok(secs) if secs > 0 && secs <= MAX_TIMEOUT_SECS => secs,
            _ => return ModerationOutcome::InvalidDuration,
        };
        if let Err(e) = self.membership.timeout(target, duration_secs, reason).await {
            return refused(target, ModerationAction::Timeout, e);
        }
        self.record(
            ModerationAction::Timeout,
            target,
            moderator,
            reason,
            Some(duration_secs),
        )
        .await;
        ModerationOutcome::TimedOut { duration_secs }
    }

    pub async fn untimeout(
        &self,
        target: &MemberId,
        reason: &str,
        moderator: &MemberId,
    ) -> ModerationOutcome {
        if let Err(e) = self.membership.remove_timeout(target, reason).await {
            return refused(target, ModerationAction::Untimeout, e);
        }
        self.record(ModerationAction::Untimeout, target, moderator, reason, None)
            .await;
        ModerationOutcome::Done
    }

    /// Warnings have no platform action; the DM is best effort.
    pub async fn warn(&self, target: &MemberId, reason: &str, moderator: &MemberId) -> ModerationOutcome {
        self.record(ModerationAction::Warn, target, moderator, reason, None).await;
        let notified = self
            .notifier
            .send_direct(target, &self.messages.warning(reason))
            .await
            .is_ok();
        ModerationOutcome::Warned { notified }
    }

    /// Newest first. `limit` is clamped to `1..=25` and defaults to 10.
    pub fn history(
        &self,
        target: Option<&MemberId>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredModerationEntry>, BotError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        Ok(self.log.recent(target, limit)?)
    }

    async fn record(
        &self,
        action: ModerationAction,
        target: &MemberId,
        moderator: &MemberId,
        reason: &str,
        duration_secs: Option<u64>,
    ) {
        let mut entry = ModerationLogEntry::new(
            action,
            target.clone(),
            Actor::Member(moderator.clone()),
            reason,
            self.clock.now(),
        );
        if let Some(secs) = duration_secs {
            entry = entry.with_duration(secs);
        }
        self.audit.record_moderation_action(entry).await;
    }
}

fn refused(target: &MemberId, action: ModerationAction, error: PlatformError) -> ModerationOutcome {
    tracing::warn!(member = %target, %action, error = %error, "moderation action refused by platform");
    ModerationOutcome::Refused(error.to_string())
}
