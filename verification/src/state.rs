//! Derived verification status.

use std::fmt;

use kahukura_types::VerificationRecord;

/// Where a record sits in the verification flow.
///
/// Not stored: derived from the record's fields. The banned flag is an
/// independent axis and is not part of the status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationStatus {
    Unverified,
    PendingCode,
    Verified,
}

impl VerificationStatus {
    pub fn of(record: &VerificationRecord) -> Self {
        if record.verified {
            Self::Verified
        } else if record.pending_code.is_some() {
            Self::PendingCode
        } else {
            Self::Unverified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::PendingCode => "pending_code",
            Self::Verified => "verified",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
