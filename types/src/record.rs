//! The per-member verification record.

use serde::{Deserialize, Serialize};

use crate::{Email, MemberId, Timestamp};

/// Schema version written by this build.
pub const CURRENT_RECORD_SCHEMA: u16 = 1;

/// One record per member who has ever joined or attempted verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// Layout version, checked when a record is decoded.
    pub schema_version: u16,
    /// Store-managed write counter. 0 means the record has never been stored.
    pub revision: u64,
    pub member_id: MemberId,
    /// Current email claim. Only unique among verified records.
    pub email: Option<Email>,
    /// Prior claim, kept when an administrator overwrites the email.
    pub previous_email: Option<Email>,
    pub verified: bool,
    /// Independent of `verified`; cleared only by an explicit unban.
    pub banned: bool,
    pub pending_code: Option<PendingCode>,
    pub manual_override: Option<ManualOverride>,
    pub last_export_request_at: Option<Timestamp>,
}

/// An outstanding verification code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCode {
    /// Six digits, `100000..=999999`.
    pub code: u32,
    pub expires_at: Timestamp,
    pub last_attempt_at: Timestamp,
}

/// An administrator bypass of the email-code flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub verified: bool,
    pub reason: String,
    pub executor_id: MemberId,
    pub executed_at: Timestamp,
}

impl VerificationRecord {
    /// A fresh, never-stored record: unverified, unbanned, no email.
    pub fn new(member_id: MemberId) -> Self {
        Self {
            schema_version: CURRENT_RECORD_SCHEMA,
            revision: 0,
            member_id,
            email: None,
            previous_email: None,
            verified: false,
            banned: false,
            pending_code: None,
            manual_override: None,
            last_export_request_at: None,
        }
    }

    /// Whether this record claims `email`.
    pub fn claims(&self, email: &Email) -> bool {
        self.email.as_ref() == Some(email)
    }

    /// Whether the member holds any personal data beyond the bare id.
    pub fn holds_personal_data(&self) -> bool {
        self.email.is_some() || self.previous_email.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> MemberId {
        MemberId::new(id).unwrap()
    }

    #[test]
    fn new_record_is_blank() {
        let record = VerificationRecord::new(member("1"));
        assert_eq!(record.schema_version, CURRENT_RECORD_SCHEMA);
        assert_eq!(record.revision, 0);
        assert!(!record.verified);
        assert!(!record.banned);
        assert!(!record.holds_personal_data());
    }

    #[test]
    fn claims_compares_normalized_email() {
        let mut record = VerificationRecord::new(member("1"));
        record.email = Some(Email::parse("a@uni.edu").unwrap());
        assert!(record.claims(&Email::parse("A@Uni.Edu").unwrap()));
        assert!(!record.claims(&Email::parse("b@uni.edu").unwrap()));
    }

    #[test]
    fn bincode_preserves_optional_fields() {
        let mut record = VerificationRecord::new(member("7"));
        record.email = Some(Email::parse("a@uni.edu").unwrap());
        record.pending_code = Some(PendingCode {
            code: 123_456,
            expires_at: Timestamp::new(600),
            last_attempt_at: Timestamp::new(0),
        });
        let bytes = bincode::serialize(&record).unwrap();
        let decoded: VerificationRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, record);
    }
}
