//! Verification record storage trait.

use crate::StoreError;
use kahukura_types::{Email, MemberId, Timestamp, VerificationRecord};

/// Persistence of verification records, keyed by member id.
///
/// Writes to a single record are linearizable. Every write bumps the
/// record's `revision`; [`IdentityStore::upsert`] refuses to overwrite a
/// revision it has not seen, so a full-record write can never silently
/// revert a concurrent narrow update.
pub trait IdentityStore: Send + Sync {
    /// Point lookup.
    fn get(&self, member: &MemberId) -> Result<Option<VerificationRecord>, StoreError>;

    /// First record claiming `email`, if any.
    fn get_by_email(&self, email: &Email) -> Result<Option<VerificationRecord>, StoreError>;

    /// Every record claiming `email` except `exclude`'s.
    fn get_many_by_email_excluding(
        &self,
        email: &Email,
        exclude: &MemberId,
    ) -> Result<Vec<VerificationRecord>, StoreError>;

    /// Replace the record's mutable fields.
    ///
    /// Succeeds only when the stored revision equals `record.revision`
    /// (an absent record counts as revision 0). Returns the stored copy,
    /// whose revision is one higher; otherwise [`StoreError::Conflict`].
    fn upsert(&self, record: &VerificationRecord) -> Result<VerificationRecord, StoreError>;

    /// Flip only the banned flag. Returns `false` if no record exists.
    fn set_banned(&self, member: &MemberId, banned: bool) -> Result<bool, StoreError>;

    /// Flip only the verified flag. Returns `false` if no record exists.
    fn set_verified(&self, member: &MemberId, verified: bool) -> Result<bool, StoreError>;

    /// Hard delete. Returns `false` if no record existed.
    fn delete(&self, member: &MemberId) -> Result<bool, StoreError>;

    /// Stamp the last self-service export. Returns `false` if no record exists.
    fn set_last_export_request(&self, member: &MemberId, at: Timestamp)
        -> Result<bool, StoreError>;

    /// Number of stored records.
    fn count(&self) -> Result<u64, StoreError>;
}
