//! Nullable platform: record membership actions and messages instead of
//! sending them.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use kahukura_platform::{
    AuditLog, ConfirmationChoice, ConfirmationPrompt, DataExport, Mailer, Membership, Notifier,
    PlatformError,
};
use kahukura_types::{Email, MemberId, ModerationLogEntry};

/// A membership action performed against [`NullMembership`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipCall {
    AddRestriction(MemberId),
    RemoveRestriction(MemberId),
    Evict { member: MemberId, reason: String },
    Ban { member: MemberId, reason: String },
    Unban { member: MemberId, reason: String },
    Timeout { member: MemberId, duration_secs: u64, reason: String },
    RemoveTimeout { member: MemberId, reason: String },
}

/// An in-memory community.
pub struct NullMembership {
    members: Mutex<HashSet<MemberId>>,
    restricted: Mutex<HashSet<MemberId>>,
    banned: Mutex<HashSet<MemberId>>,
    calls: Mutex<Vec<MembershipCall>>,
    failing_evictions: Mutex<HashSet<MemberId>>,
    unreachable: AtomicBool,
}

impl NullMembership {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(HashSet::new()),
            restricted: Mutex::new(HashSet::new()),
            banned: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            failing_evictions: Mutex::new(HashSet::new()),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Put a member in the community.
    pub fn join(&self, member: &MemberId) {
        self.members.lock().unwrap().insert(member.clone());
    }

    /// Make evictions of `member` fail with [`PlatformError::Rejected`].
    pub fn fail_evictions_of(&self, member: &MemberId) {
        self.failing_evictions.lock().unwrap().insert(member.clone());
    }

    /// Make every call fail with [`PlatformError::Unreachable`].
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn contains(&self, member: &MemberId) -> bool {
        self.members.lock().unwrap().contains(member)
    }

    pub fn is_restricted(&self, member: &MemberId) -> bool {
        self.restricted.lock().unwrap().contains(member)
    }

    pub fn is_banned(&self, member: &MemberId) -> bool {
        self.banned.lock().unwrap().contains(member)
    }

    /// Every successful call, in order.
    pub fn calls(&self) -> Vec<MembershipCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn evictions(&self) -> Vec<MemberId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MembershipCall::Evict { member, .. } => Some(member),
                _ => None,
            })
            .collect()
    }

    fn check_reachable(&self) -> Result<(), PlatformError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(PlatformError::Unreachable("null platform switched off".into()));
        }
        Ok(())
    }

    fn record(&self, call: MembershipCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for NullMembership {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Membership for NullMembership {
    async fn add_restriction(&self, member: &MemberId) -> Result<(), PlatformError> {
        self.check_reachable()?;
        self.restricted.lock().unwrap().insert(member.clone());
        self.record(MembershipCall::AddRestriction(member.clone()));
        Ok(())
    }

    async fn remove_restriction(&self, member: &MemberId) -> Result<(), PlatformError> {
        self.check_reachable()?;
        self.restricted.lock().unwrap().remove(member);
        self.record(MembershipCall::RemoveRestriction(member.clone()));
        Ok(())
    }

    async fn evict(&self, member: &MemberId, reason: &str) -> Result<(), PlatformError> {
        self.check_reachable()?;
        if self.failing_evictions.lock().unwrap().contains(member) {
            return Err(PlatformError::Rejected(format!("cannot evict {member}")));
        }
        if !self.members.lock().unwrap().remove(member) {
            return Err(PlatformError::Rejected(format!("{member} is not a member")));
        }
        self.restricted.lock().unwrap().remove(member);
        self.record(MembershipCall::Evict {
            member: member.clone(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn ban(&self, member: &MemberId, reason: &str) -> Result<(), PlatformError> {
        self.check_reachable()?;
        self.members.lock().unwrap().remove(member);
        self.restricted.lock().unwrap().remove(member);
        self.banned.lock().unwrap().insert(member.clone());
        self.record(MembershipCall::Ban {
            member: member.clone(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn unban(&self, member: &MemberId, reason: &str) -> Result<(), PlatformError> {
        self.check_reachable()?;
        if !self.banned.lock().unwrap().remove(member) {
            return Err(PlatformError::Rejected(format!("{member} is not banned")));
        }
        self.record(MembershipCall::Unban {
            member: member.clone(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn timeout(
        &self,
        member: &MemberId,
        duration_secs: u64,
        reason: &str,
    ) -> Result<(), PlatformError> {
        self.check_reachable()?;
        self.record(MembershipCall::Timeout {
            member: member.clone(),
            duration_secs,
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn remove_timeout(&self, member: &MemberId, reason: &str) -> Result<(), PlatformError> {
        self.check_reachable()?;
        self.record(MembershipCall::RemoveTimeout {
            member: member.clone(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn is_member(&self, member: &MemberId) -> Result<bool, PlatformError> {
        self.check_reachable()?;
        Ok(self.contains(member))
    }
}

/// Records messages. Direct messages to members with DMs disabled fail.
pub struct NullNotifier {
    direct: Mutex<Vec<(MemberId, String)>>,
    fallback: Mutex<Vec<String>>,
    dms_disabled: Mutex<HashSet<MemberId>>,
    fallback_broken: AtomicBool,
}

impl NullNotifier {
    pub fn new() -> Self {
        Self {
            direct: Mutex::new(Vec::new()),
            fallback: Mutex::new(Vec::new()),
            dms_disabled: Mutex::new(HashSet::new()),
            fallback_broken: AtomicBool::new(false),
        }
    }

    pub fn disable_dms_for(&self, member: &MemberId) {
        self.dms_disabled.lock().unwrap().insert(member.clone());
    }

    pub fn break_fallback_channel(&self) {
        self.fallback_broken.store(true, Ordering::SeqCst);
    }

    /// Direct messages delivered to `member`.
    pub fn direct_to(&self, member: &MemberId) -> Vec<String> {
        self.direct
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == member)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn fallback_posts(&self) -> Vec<String> {
        self.fallback.lock().unwrap().clone()
    }
}

impl Default for NullNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for NullNotifier {
    async fn send_direct(&self, member: &MemberId, text: &str) -> Result<(), PlatformError> {
        if self.dms_disabled.lock().unwrap().contains(member) {
            return Err(PlatformError::Rejected("cannot send messages to this user".into()));
        }
        self.direct
            .lock()
            .unwrap()
            .push((member.clone(), text.to_string()));
        Ok(())
    }

    async fn send_to_fallback_channel(&self, text: &str) -> Result<(), PlatformError> {
        if self.fallback_broken.load(Ordering::SeqCst) {
            return Err(PlatformError::Rejected("missing access".into()));
        }
        self.fallback.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Records outgoing mail.
pub struct NullMailer {
    codes: Mutex<Vec<(Email, u32)>>,
    exports: Mutex<Vec<(Email, DataExport)>>,
    failing: AtomicBool,
}

impl NullMailer {
    pub fn new() -> Self {
        Self {
            codes: Mutex::new(Vec::new()),
            exports: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every send fail with [`PlatformError::Unreachable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn codes_sent(&self) -> Vec<(Email, u32)> {
        self.codes.lock().unwrap().clone()
    }

    pub fn exports_sent(&self) -> Vec<(Email, DataExport)> {
        self.exports.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), PlatformError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlatformError::Unreachable("null mailer switched off".into()));
        }
        Ok(())
    }
}

impl Default for NullMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for NullMailer {
    async fn send_code(&self, email: &Email, code: u32) -> Result<(), PlatformError> {
        self.check()?;
        self.codes.lock().unwrap().push((email.clone(), code));
        Ok(())
    }

    async fn send_data_export(&self, email: &Email, export: &DataExport) -> Result<(), PlatformError> {
        self.check()?;
        self.exports
            .lock()
            .unwrap()
            .push((email.clone(), export.clone()));
        Ok(())
    }
}

/// Collects audit entries in memory.
pub struct NullAuditLog {
    entries: Mutex<Vec<ModerationLogEntry>>,
}

impl NullAuditLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<ModerationLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl Default for NullAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLog for NullAuditLog {
    async fn record_moderation_action(&self, entry: ModerationLogEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

/// Answers prompts from a script. Once the script runs out the prompt
/// never answers, which exercises the caller's timeout.
pub struct NullConfirmationPrompt {
    answers: Mutex<VecDeque<Result<ConfirmationChoice, PlatformError>>>,
    asked: Mutex<Vec<(MemberId, String)>>,
}

impl NullConfirmationPrompt {
    pub fn new(answers: Vec<Result<ConfirmationChoice, PlatformError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Confirms every prompt.
    pub fn always_confirm() -> Self {
        Self::new(vec![Ok(ConfirmationChoice::Confirm); 64])
    }

    /// Never answers.
    pub fn silent() -> Self {
        Self::new(Vec::new())
    }

    pub fn push(&self, answer: Result<ConfirmationChoice, PlatformError>) {
        self.answers.lock().unwrap().push_back(answer);
    }

    /// Prompts shown so far.
    pub fn asked(&self) -> Vec<(MemberId, String)> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfirmationPrompt for NullConfirmationPrompt {
    async fn ask(&self, invoker: &MemberId, prompt: &str) -> Result<ConfirmationChoice, PlatformError> {
        self.asked
            .lock()
            .unwrap()
            .push((invoker.clone(), prompt.to_string()));
        let answer = self.answers.lock().unwrap().pop_front();
        match answer {
            Some(answer) => answer,
            None => std::future::pending().await,
        }
    }
}
