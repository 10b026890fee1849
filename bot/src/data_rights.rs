//! Lookup, self-service export and hard deletion of verification data.

use std::sync::Arc;

use kahukura_platform::{DataExport, Mailer, Membership};
use kahukura_store::IdentityStore;
use kahukura_types::{Clock, Email, MemberId, Timestamp, VerificationRecord};
use serde::Serialize;

use crate::confirm::ConfirmationGate;
use crate::{BotError, BotMetrics};

pub const DELETION_EVICT_REASON: &str = "User's data was deleted from the verification database";

/// What an administrator sees about a member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberSummary {
    pub member: MemberId,
    pub email: Option<Email>,
    pub verified: bool,
    pub banned: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    NotFound,
    Found(MemberSummary),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Nothing beyond the member id is held.
    NoData,
    /// Only a previous email is held, so there is no address to mail to.
    ManualProcessingRequired,
    Throttled { last_request: Timestamp },
    Cancelled { timed_out: bool },
    Exported { file_name: String },
    DeliveryFailed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    NotFound,
    Cancelled { timed_out: bool },
    Deleted {
        evicted: bool,
        eviction_error: Option<String>,
    },
}

/// The exported document. Internal bookkeeping fields are left out.
#[derive(Serialize)]
struct ExportDocument<'a> {
    member_id: &'a MemberId,
    email: Option<&'a Email>,
    previous_email: Option<&'a Email>,
    verified: bool,
    banned: bool,
    exported_at: Timestamp,
}

impl<'a> ExportDocument<'a> {
    fn of(record: &'a VerificationRecord, now: Timestamp) -> Self {
        Self {
            member_id: &record.member_id,
            email: record.email.as_ref(),
            previous_email: record.previous_email.as_ref(),
            verified: record.verified,
            banned: record.banned,
            exported_at: now,
        }
    }
}

pub fn export_file_name(member: &MemberId, now: Timestamp) -> String {
    format!("{}_data_{}.json", member, now.as_secs())
}

pub struct DataRights {
    identity: Arc<dyn IdentityStore>,
    membership: Arc<dyn Membership>,
    mailer: Arc<dyn Mailer>,
    gate: Arc<ConfirmationGate>,
    clock: Arc<dyn Clock>,
    export_throttle_secs: u64,
    metrics: Arc<BotMetrics>,
}

impl DataRights {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        membership: Arc<dyn Membership>,
        mailer: Arc<dyn Mailer>,
        gate: Arc<ConfirmationGate>,
        clock: Arc<dyn Clock>,
        export_throttle_secs: u64,
        metrics: Arc<BotMetrics>,
    ) -> Self {
        Self {
            identity,
            membership,
            mailer,
            gate,
            clock,
            export_throttle_secs,
            metrics,
        }
    }

    pub fn lookup(&self, target: &MemberId) -> Result<LookupOutcome, BotError> {
        Ok(match self.identity.get(target)? {
            None => LookupOutcome::NotFound,
            Some(record) => LookupOutcome::Found(MemberSummary {
                member: record.member_id,
                email: record.email,
                verified: record.verified,
                banned: record.banned,
            }),
        })
    }

    pub async fn export_my_data(&self, member: &MemberId) -> Result<ExportOutcome, BotError> {
        let Some(record) = self.identity.get(member)? else {
            return Ok(ExportOutcome::NoData);
        };
        if !record.holds_personal_data() {
            return Ok(ExportOutcome::NoData);
        }
        let Some(email) = record.email.clone() else {
            tracing::info!(member = %member, "export needs manual processing: only a previous email is held");
            return Ok(ExportOutcome::ManualProcessingRequired);
        };

        let now = self.clock.now();
        if let Some(last) = record.last_export_request_at {
            if !last.has_expired(self.export_throttle_secs, now) {
                return Ok(ExportOutcome::Throttled { last_request: last });
            }
        }

        let prompt = format!(
            "Your verification data will be emailed to {}. Continue?",
            email
        );
        let answer = self.gate.confirm(member, &prompt).await;
        if !answer.is_confirmed() {
            return Ok(ExportOutcome::Cancelled {
                timed_out: answer == crate::Confirmation::TimedOut,
            });
        }

        // Re-read: the record may have changed while the prompt was open.
        let Some(record) = self.identity.get(member)? else {
            return Ok(ExportOutcome::NoData);
        };
        let Some(email) = record.email.clone() else {
            return Ok(ExportOutcome::ManualProcessingRequired);
        };
        let now = self.clock.now();
        let contents = serde_json::to_string_pretty(&ExportDocument::of(&record, now))?;
        let export = DataExport {
            file_name: export_file_name(member, now),
            contents,
        };

        if let Err(e) = self.mailer.send_data_export(&email, &export).await {
            tracing::warn!(member = %member, email_domain = email.domain(), error = %e, "data export not delivered");
            return Ok(ExportOutcome::DeliveryFailed);
        }
        self.identity.set_last_export_request(member, now)?;
        tracing::info!(member = %member, email_domain = email.domain(), "data export sent");
        Ok(ExportOutcome::Exported {
            file_name: export.file_name,
        })
    }

    /// Hard-delete a record, then evict the member if present. Authorization is
    /// the caller's job.
    pub async fn delete_user_data(
        &self,
        target: &MemberId,
        executor: &MemberId,
    ) -> Result<DeleteOutcome, BotError> {
        if self.identity.get(target)?.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let prompt = format!(
            "This permanently deletes the verification data of {} and removes them from the server. Continue?",
            target.mention()
        );
        let answer = self.gate.confirm(executor, &prompt).await;
        if !answer.is_confirmed() {
            return Ok(DeleteOutcome::Cancelled {
                timed_out: answer == crate::Confirmation::TimedOut,
            });
        }

        if !self.identity.delete(target)? {
            return Ok(DeleteOutcome::NotFound);
        }
        self.metrics.records.dec();
        tracing::info!(member = %target, executor = %executor, "verification data deleted");

        let eviction = match self.membership.is_member(target).await {
            Ok(false) => Ok(false),
            Ok(true) => self
                .membership
                .evict(target, DELETION_EVICT_REASON)
                .await
                .map(|()| true),
            Err(e) => Err(e),
        };
        match eviction {
            Ok(evicted) => Ok(DeleteOutcome::Deleted {
                evicted,
                eviction_error: None,
            }),
            Err(e) => {
                self.metrics.eviction_failures.inc();
                tracing::error!(member = %target, error = %e, "data deleted but member not evicted");
                Ok(DeleteOutcome::Deleted {
                    evicted: false,
                    eviction_error: Some(e.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use kahukura_nullables::{
        NullClock, NullConfirmationPrompt, NullIdentityStore, NullMailer, NullMembership,
    };
    use kahukura_platform::ConfirmationChoice;

    struct Fixture {
        identity: Arc<NullIdentityStore>,
        membership: Arc<NullMembership>,
        mailer: Arc<NullMailer>,
        clock: Arc<NullClock>,
        rights: DataRights,
    }

    fn fixture(prompt: NullConfirmationPrompt) -> Fixture {
        let identity = Arc::new(NullIdentityStore::new());
        let membership = Arc::new(NullMembership::new());
        let mailer = Arc::new(NullMailer::new());
        let clock = Arc::new(NullClock::new(1_000_000));
        let gate = Arc::new(ConfirmationGate::new(Arc::new(prompt), Duration::from_secs(60)));
        let rights = DataRights::new(
            identity.clone(),
            membership.clone(),
            mailer.clone(),
            gate,
            clock.clone(),
            604_800,
            Arc::new(BotMetrics::new()),
        );
        Fixture {
            identity,
            membership,
            mailer,
            clock,
            rights,
        }
    }

    fn member(id: &str) -> MemberId {
        MemberId::new(id).unwrap()
    }

    fn verified(id: &str, email: &str) -> VerificationRecord {
        let mut record = VerificationRecord::new(member(id));
        record.email = Some(Email::parse(email).unwrap());
        record.verified = true;
        record
    }

    #[tokio::test]
    async fn lookup_reports_summary() {
        let fx = fixture(NullConfirmationPrompt::always_confirm());
        assert_eq!(fx.rights.lookup(&member("1")).unwrap(), LookupOutcome::NotFound);
        fx.identity.insert(verified("1", "a@uni.edu"));
        match fx.rights.lookup(&member("1")).unwrap() {
            LookupOutcome::Found(summary) => {
                assert!(summary.verified);
                assert!(!summary.banned);
                assert_eq!(summary.email.unwrap().as_str(), "a@uni.edu");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn export_without_data_sends_nothing() {
        let fx = fixture(NullConfirmationPrompt::always_confirm());
        assert_eq!(fx.rights.export_my_data(&member("1")).await.unwrap(), ExportOutcome::NoData);
        fx.identity.insert(VerificationRecord::new(member("1")));
        assert_eq!(fx.rights.export_my_data(&member("1")).await.unwrap(), ExportOutcome::NoData);
        assert!(fx.mailer.exports_sent().is_empty());
    }

    #[tokio::test]
    async fn export_with_only_previous_email_needs_manual_processing() {
        let fx = fixture(NullConfirmationPrompt::always_confirm());
        let mut record = VerificationRecord::new(member("1"));
        record.previous_email = Some(Email::parse("old@uni.edu").unwrap());
        fx.identity.insert(record);
        assert_eq!(
            fx.rights.export_my_data(&member("1")).await.unwrap(),
            ExportOutcome::ManualProcessingRequired
        );
    }

    #[tokio::test]
    async fn export_mails_document_and_stamps_request() {
        let fx = fixture(NullConfirmationPrompt::always_confirm());
        fx.identity.insert(verified("1", "a@uni.edu"));
        let outcome = fx.rights.export_my_data(&member("1")).await.unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Exported {
                file_name: "1_data_1000000.json".to_string()
            }
        );
        let sent = fx.mailer.exports_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.as_str(), "a@uni.edu");
        let doc: serde_json::Value = serde_json::from_str(&sent[0].1.contents).unwrap();
        assert_eq!(doc["email"], "a@uni.edu");
        assert!(doc.get("revision").is_none());
        assert!(doc.get("pending_code").is_none());
        assert!(doc.get("manual_override").is_none());
        let stored = fx.identity.get(&member("1")).unwrap().unwrap();
        assert_eq!(stored.last_export_request_at, Some(Timestamp::new(1_000_000)));
    }

    #[tokio::test]
    async fn export_is_throttled_for_a_week() {
        let fx = fixture(NullConfirmationPrompt::always_confirm());
        fx.identity.insert(verified("1", "a@uni.edu"));
        fx.rights.export_my_data(&member("1")).await.unwrap();
        fx.clock.advance(604_799);
        assert_eq!(
            fx.rights.export_my_data(&member("1")).await.unwrap(),
            ExportOutcome::Throttled {
                last_request: Timestamp::new(1_000_000)
            }
        );
        fx.clock.advance(1);
        assert!(matches!(
            fx.rights.export_my_data(&member("1")).await.unwrap(),
            ExportOutcome::Exported { .. }
        ));
    }

    #[tokio::test]
    async fn failed_export_mail_is_not_stamped() {
        let fx = fixture(NullConfirmationPrompt::always_confirm());
        fx.identity.insert(verified("1", "a@uni.edu"));
        fx.mailer.set_failing(true);
        assert_eq!(
            fx.rights.export_my_data(&member("1")).await.unwrap(),
            ExportOutcome::DeliveryFailed
        );
        assert!(fx.identity.get(&member("1")).unwrap().unwrap().last_export_request_at.is_none());
    }

    #[tokio::test]
    async fn cancelled_export_changes_nothing() {
        let fx = fixture(NullConfirmationPrompt::new(vec![Ok(ConfirmationChoice::Cancel)]));
        fx.identity.insert(verified("1", "a@uni.edu"));
        assert_eq!(
            fx.rights.export_my_data(&member("1")).await.unwrap(),
            ExportOutcome::Cancelled { timed_out: false }
        );
        assert!(fx.mailer.exports_sent().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_record_and_evicts() {
        let fx = fixture(NullConfirmationPrompt::always_confirm());
        fx.identity.insert(verified("1", "a@uni.edu"));
        fx.membership.join(&member("1"));
        let outcome = fx.rights.delete_user_data(&member("1"), &member("99")).await.unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::Deleted {
                evicted: true,
                eviction_error: None
            }
        );
        assert!(fx.identity.get(&member("1")).unwrap().is_none());
        assert!(!fx.membership.contains(&member("1")));
    }

    #[tokio::test]
    async fn delete_of_absent_member_skips_eviction() {
        let fx = fixture(NullConfirmationPrompt::always_confirm());
        fx.identity.insert(verified("1", "a@uni.edu"));
        let outcome = fx.rights.delete_user_data(&member("1"), &member("99")).await.unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::Deleted {
                evicted: false,
                eviction_error: None
            }
        );
        assert_eq!(
            fx.rights.delete_user_data(&member("1"), &member("99")).await.unwrap(),
            DeleteOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn delete_survives_eviction_failure() {
        let fx = fixture(NullConfirmationPrompt::always_confirm());
        fx.identity.insert(verified("1", "a@uni.edu"));
        fx.membership.join(&member("1"));
        fx.membership.fail_evictions_of(&member("1"));
        match fx.rights.delete_user_data(&member("1"), &member("99")).await.unwrap() {
            DeleteOutcome::Deleted {
                evicted,
                eviction_error,
            } => {
                assert!(!evicted);
                assert!(eviction_error.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(fx.identity.get(&member("1")).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_delete_times_out() {
        let fx = fixture(NullConfirmationPrompt::silent());
        fx.identity.insert(verified("1", "a@uni.edu"));
        assert_eq!(
            fx.rights.delete_user_data(&member("1"), &member("99")).await.unwrap(),
            DeleteOutcome::Cancelled { timed_out: true }
        );
        assert!(fx.identity.get(&member("1")).unwrap().is_some());
    }
}
