//! Command surface and the [`Bot`] that routes to the services.
//!
//! Handlers are thin: check the role, parse nothing beyond what the
//! services take, and turn outcomes into reply text.

use std::sync::Arc;
use std::time::Duration;

use kahukura_platform::{ConfirmationPrompt, Mailer, Membership, Notifier};
use kahukura_store::{IdentityStore, ModerationLogStore, StoredModerationEntry};
use kahukura_types::{Clock, MemberId};
use kahukura_utils::format_duration;
use kahukura_verification::{CodeSource, Rejection};
use serde::{Deserialize, Serialize};

use crate::admission::AdmissionController;
use crate::audit::StoreAuditLog;
use crate::authz::{Authorizer, Invoker, Role};
use crate::confirm::ConfirmationGate;
use crate::conflict::ConflictResolver;
use crate::data_rights::{DataRights, DeleteOutcome, ExportOutcome, LookupOutcome};
use crate::issuer::CodeIssuer;
use crate::machine::{ManualVerifyOutcome, RequestOutcome, SubmitOutcome, VerificationMachine};
use crate::moderation::{ModerationOutcome, ModerationService, DEFAULT_REASON};
use crate::{BotConfig, BotError, BotMetrics, Messages, Rules};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BotCommand {
    Verify {
        email: String,
    },
    Code {
        code: String,
    },
    ManualVerify {
        target: MemberId,
        email: String,
        reason: String,
    },
    Lookup {
        target: MemberId,
    },
    MyData,
    DeleteData {
        target: MemberId,
    },
    Ban {
        target: MemberId,
        reason: String,
    },
    Kick {
        target: MemberId,
        #[serde(default)]
        reason: Option<String>,
    },
    Timeout {
        target: MemberId,
        duration: String,
        #[serde(default)]
        reason: Option<String>,
    },
    Untimeout {
        target: MemberId,
        #[serde(default)]
        reason: Option<String>,
    },
    Unban {
        target: MemberId,
        #[serde(default)]
        reason: Option<String>,
    },
    Warn {
        target: MemberId,
        reason: String,
    },
    Modlogs {
        #[serde(default)]
        target: Option<MemberId>,
        #[serde(default)]
        limit: Option<usize>,
    },
}

impl BotCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Verify { .. } => "verify",
            Self::Code { .. } => "code",
            Self::ManualVerify { .. } => "manual_verify",
            Self::Lookup { .. } => "lookup",
            Self::MyData => "my_data",
            Self::DeleteData { .. } => "delete_data",
            Self::Ban { .. } => "ban",
            Self::Kick { .. } => "kick",
            Self::Timeout { .. } => "timeout",
            Self::Untimeout { .. } => "untimeout",
            Self::Unban { .. } => "unban",
            Self::Warn { .. } => "warn",
            Self::Modlogs { .. } => "modlogs",
        }
    }

    fn required_role(&self) -> Option<Role> {
        match self {
            Self::Verify { .. } | Self::Code { .. } | Self::MyData => None,
            Self::ManualVerify { .. } | Self::Lookup { .. } => Some(Role::Administrator),
            Self::DeleteData { .. } => Some(Role::DataSteward),
            Self::Ban { .. }
            | Self::Kick { .. }
            | Self::Timeout { .. }
            | Self::Untimeout { .. }
            | Self::Unban { .. }
            | Self::Warn { .. }
            | Self::Modlogs { .. } => Some(Role::Moderator),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub content: String,
    /// Shown only to the invoker.
    pub ephemeral: bool,
}

impl CommandReply {
    fn private(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

pub const NOT_PERMITTED: &str = "You do not have permission to use this command.";
pub const GENERIC_FAILURE: &str = "Something went wrong on our side. Please try again later.";

/// External capabilities and stores the bot is built over.
pub struct Collaborators {
    pub identity: Arc<dyn IdentityStore>,
    pub moderation_log: Arc<dyn ModerationLogStore>,
    pub membership: Arc<dyn Membership>,
    pub notifier: Arc<dyn Notifier>,
    pub mailer: Arc<dyn Mailer>,
    pub prompt: Arc<dyn ConfirmationPrompt>,
    pub clock: Arc<dyn Clock>,
    pub codes: Arc<dyn CodeSource>,
}

pub struct Bot {
    pub(crate) authorizer: Authorizer,
    pub(crate) machine: Arc<VerificationMachine>,
    pub(crate) admission: AdmissionController,
    pub(crate) data_rights: DataRights,
    pub(crate) moderation: ModerationService,
    metrics: Arc<BotMetrics>,
}

impl Bot {
    pub fn new(config: &BotConfig, c: Collaborators) -> Result<Self, BotError> {
        config.validate()?;
        let metrics = Arc::new(BotMetrics::new());
        metrics.records.set(c.identity.count()? as i64);

        let rules = Arc::new(Rules::new(config.domain_policy()?, config.verification_params()));
        let messages = Arc::new(Messages::new(&config.verify_command_hint, &config.accepted_domains));
        let audit = Arc::new(StoreAuditLog::new(c.moderation_log.clone()));
        let gate = Arc::new(ConfirmationGate::new(
            c.prompt,
            Duration::from_secs(config.confirmation_timeout_secs),
        ));

        let resolver = Arc::new(ConflictResolver::new(
            c.identity.clone(),
            c.membership.clone(),
            audit.clone(),
            c.clock.clone(),
            rules.clone(),
            metrics.clone(),
        ));
        let issuer = CodeIssuer::new(c.codes, c.mailer.clone(), metrics.clone());
        let machine = Arc::new(VerificationMachine::new(
            c.identity.clone(),
            c.membership.clone(),
            c.notifier.clone(),
            audit.clone(),
            c.clock.clone(),
            rules,
            issuer,
            resolver,
            messages.clone(),
            metrics.clone(),
        ));
        let admission = AdmissionController::new(
            c.identity.clone(),
            c.membership.clone(),
            c.notifier.clone(),
            audit.clone(),
            c.clock.clone(),
            messages.clone(),
            metrics.clone(),
        );
        let data_rights = DataRights::new(
            c.identity,
            c.membership.clone(),
            c.mailer,
            gate,
            c.clock.clone(),
            config.export_throttle_secs,
            metrics.clone(),
        );
        let moderation = ModerationService::new(
            c.membership,
            c.notifier,
            audit,
            c.moderation_log,
            machine.clone(),
            c.clock,
            messages,
        );

        Ok(Self {
            authorizer: Authorizer::new(
                config.admin_ids.iter().cloned(),
                config.moderator_ids.iter().cloned(),
                config.data_steward_ids.iter().cloned(),
            ),
            machine,
            admission,
            data_rights,
            moderation,
            metrics,
        })
    }

    pub fn metrics(&self) -> &Arc<BotMetrics> {
        &self.metrics
    }

    /// Run one command. Never fails: errors become a generic reply.
    pub async fn dispatch(&self, invoker: &Invoker, command: BotCommand) -> CommandReply {
        let name = command.name();
        if let Some(role) = command.required_role() {
            if !self.authorizer.has_role(invoker, role) {
                tracing::info!(member = %invoker.id, command = name, ?role, "command refused: missing role");
                return CommandReply::private(NOT_PERMITTED);
            }
        }
        match self.run(invoker, command).await {
            Ok(reply) => reply,
            Err(e) => {
                if matches!(e, BotError::Store(_) | BotError::WriteContention(_)) {
                    self.metrics.store_errors.inc();
                }
                tracing::error!(member = %invoker.id, command = name, error = %e, "command failed");
                CommandReply::private(GENERIC_FAILURE)
            }
        }
    }

    async fn run(&self, invoker: &Invoker, command: BotCommand) -> Result<CommandReply, BotError> {
        let me = &invoker.id;
        let text = match command {
            BotCommand::Verify { email } => {
                request_text(self.machine.request_verification(me, &email).await?)
            }
            BotCommand::Code { code } => submit_text(self.machine.submit_code(me, &code).await?),
            BotCommand::ManualVerify {
                target,
                email,
                reason,
            } => match self.machine.manual_verify(&target, &email, &reason, me).await? {
                ManualVerifyOutcome::InvalidEmail => "That is not a valid email address.".to_string(),
                ManualVerifyOutcome::Rejected(r) => rejection_text(r).to_string(),
                ManualVerifyOutcome::Verified { sweep, .. } => {
                    let mut text = format!("User {} has been manually verified.", target.mention());
                    if !sweep.revoked.is_empty() {
                        text.push_str(&format!(
                            " Verification was revoked for {} other member(s) using the same email.",
                            sweep.revoked.len()
                        ));
                    }
                    if !sweep.is_clean() {
                        text.push_str(" Some of them could not be removed; see the logs.");
                    }
                    text
                }
            },
            BotCommand::Lookup { target } => match self.data_rights.lookup(&target)? {
                LookupOutcome::NotFound => format!("No verification record for {}.", target.mention()),
                LookupOutcome::Found(s) => format!(
                    "{}\nEmail: {}\nVerified: {}\nBanned: {}",
                    s.member.mention(),
                    s.email.map(|e| e.to_string()).unwrap_or_else(|| "none".to_string()),
                    yes_no(s.verified),
                    yes_no(s.banned),
                ),
            },
            BotCommand::MyData => export_text(self.data_rights.export_my_data(me).await?),
            BotCommand::DeleteData { target } => {
                match self.data_rights.delete_user_data(&target, me).await? {
                    DeleteOutcome::NotFound => format!("No verification record for {}.", target.mention()),
                    DeleteOutcome::Cancelled { timed_out: true } => {
                        "No answer within the time limit. Nothing was deleted.".to_string()
                    }
                    DeleteOutcome::Cancelled { timed_out: false } => {
                        "Cancelled. Nothing was deleted.".to_string()
                    }
                    DeleteOutcome::Deleted { evicted, eviction_error } => {
                        let mut text = format!("Verification data for {} has been deleted.", target.mention());
                        if evicted {
                            text.push_str(" They have been removed from the server.");
                        }
                        if let Some(e) = eviction_error {
                            text.push_str(&format!(" They could not be removed from the server: {e}"));
                        }
                        text
                    }
                }
            }
            BotCommand::Ban { target, reason } => {
                let outcome = self.moderation.ban(&target, &reason, me).await?;
                moderation_text(outcome, &target, "banned")
            }
            BotCommand::Kick { target, reason } => {
                let reason = reason.unwrap_or_else(|| DEFAULT_REASON.to_string());
                let outcome = self.moderation.kick(&target, &reason, me).await;
                moderation_text(outcome, &target, "kicked")
            }
            BotCommand::Timeout {
                target,
                duration,
                reason,
            } => {
                let reason = reason.unwrap_or_else(|| DEFAULT_REASON.to_string());
                let outcome = self.moderation.timeout(&target, &duration, &reason, me).await;
                moderation_text(outcome, &target, "timed out")
            }
            BotCommand::Untimeout { target, reason } => {
                let reason = reason.unwrap_or_else(|| DEFAULT_REASON.to_string());
                let outcome = self.moderation.untimeout(&target, &reason, me).await;
                moderation_text(outcome, &target, "released from timeout")
            }
            BotCommand::Unban { target, reason } => {
                let reason = reason.unwrap_or_else(|| DEFAULT_REASON.to_string());
                let outcome = self.moderation.unban(&target, &reason, me).await?;
                moderation_text(outcome, &target, "unbanned")
            }
            BotCommand::Warn { target, reason } => {
                let outcome = self.moderation.warn(&target, &reason, me).await;
                moderation_text(outcome, &target, "warned")
            }
            BotCommand::Modlogs { target, limit } => {
                history_text(&self.moderation.history(target.as_ref(), limit)?)
            }
        };
        Ok(CommandReply::private(text))
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn rejection_text(rejection: Rejection) -> &'static str {
    match rejection {
        Rejection::DomainNotAccepted => "That email domain is not accepted for verification.",
        Rejection::Banned => "You are banned and cannot verify.",
        Rejection::AlreadyVerified => "You are already verified.",
        Rejection::Throttled { .. } => "A code was sent recently. Please wait before requesting another.",
        Rejection::NoPendingCode => "You do not have a pending verification code.",
        Rejection::CodeMismatch => "The verification code you entered is incorrect.",
        Rejection::CodeExpired => "The verification code has expired. Please request a new one.",
    }
}

fn request_text(outcome: RequestOutcome) -> String {
    match outcome {
        RequestOutcome::InvalidEmail => "That is not a valid email address.".to_string(),
        RequestOutcome::Rejected(Rejection::Throttled { retry_after_secs }) => format!(
            "A code was sent recently. Please try again in {}.",
            format_duration(retry_after_secs)
        ),
        RequestOutcome::Rejected(r) => rejection_text(r).to_string(),
        RequestOutcome::BannedForEvasion => {
            "That email belongs to a banned member. You have been banned.".to_string()
        }
        RequestOutcome::CodeIssued { delivered: true } => {
            "A verification code has been sent to your email. Enter it with /code.".to_string()
        }
        RequestOutcome::CodeIssued { delivered: false } => {
            "We could not send the verification email. Please try again shortly.".to_string()
        }
    }
}

fn submit_text(outcome: SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::InvalidCode => "Verification codes are six digits.".to_string(),
        SubmitOutcome::Rejected(r) => rejection_text(r).to_string(),
        SubmitOutcome::Verified { .. } => {
            "Your account has been successfully verified. Please remember to select your roles!".to_string()
        }
    }
}

fn export_text(outcome: ExportOutcome) -> String {
    match outcome {
        ExportOutcome::NoData => "We do not hold any data about you.".to_string(),
        ExportOutcome::ManualProcessingRequired => {
            "Your data needs to be exported by hand. Please contact the administrators.".to_string()
        }
        ExportOutcome::Throttled { last_request } => format!(
            "You can request your data once a week. Your last request was at <t:{}>.",
            last_request.as_secs()
        ),
        ExportOutcome::Cancelled { timed_out: true } => {
            "No answer within the time limit. Nothing was sent.".to_string()
        }
        ExportOutcome::Cancelled { timed_out: false } => "Cancelled. Nothing was sent.".to_string(),
        ExportOutcome::Exported { .. } => "Your data has been emailed to you.".to_string(),
        ExportOutcome::DeliveryFailed => {
            "We could not email your data. Please try again later.".to_string()
        }
    }
}

fn moderation_text(outcome: ModerationOutcome, target: &MemberId, verb: &str) -> String {
    match outcome {
        ModerationOutcome::Done => format!("{} has been {verb}.", target.mention()),
        ModerationOutcome::TimedOut { duration_secs } => format!(
            "{} has been {verb} for {}.",
            target.mention(),
            format_duration(duration_secs)
        ),
        ModerationOutcome::Warned { notified: true } => format!("{} has been {verb}.", target.mention()),
        ModerationOutcome::Warned { notified: false } => format!(
            "{} has been {verb}, but could not be messaged.",
            target.mention()
        ),
        ModerationOutcome::InvalidDuration => {
            "Durations look like 30, 45m, 2h or 1d12h and can be at most 28 days.".to_string()
        }
        ModerationOutcome::Refused(e) => format!("Could not apply that action: {e}"),
    }
}

fn history_text(entries: &[StoredModerationEntry]) -> String {
    if entries.is_empty() {
        return "No moderation actions found.".to_string();
    }
    entries
        .iter()
        .map(|stored| {
            let e = &stored.entry;
            let mut line = format!(
                "#{} {} {} by {} at <t:{}>: {}",
                stored.id,
                e.action,
                e.target.mention(),
                e.moderator,
                e.timestamp.as_secs(),
                e.reason
            );
            if let Some(d) = &e.duration {
                line.push_str(&format!(" ({})", format_duration(d.length_secs)));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
