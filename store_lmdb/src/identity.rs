//! LMDB implementation of IdentityStore.
//!
//! `records` maps `member_id` to an encoded record. `email_index` holds one
//! empty-valued key per claim, `email ++ 0x00 ++ member_id`, maintained in the
//! same write transaction as the record so the two never disagree. Listing
//! the claimants of an email is a prefix scan.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn, RwTxn};

use kahukura_store::{IdentityStore, StoreError};
use kahukura_types::{Email, MemberId, Timestamp, VerificationRecord};

use crate::codec::{decode_record, encode_record};
use crate::LmdbError;

const INDEX_SEPARATOR: u8 = 0x00;

#[derive(Clone)]
pub struct LmdbIdentityStore {
    pub(crate) env: Arc<Env>,
    pub(crate) records_db: Database<Bytes, Bytes>,
    pub(crate) email_index_db: Database<Bytes, Bytes>,
}

/// Build the index prefix `email_bytes ++ 0x00`.
fn email_prefix(email: &Email) -> Vec<u8> {
    let e = email.as_str().as_bytes();
    let mut key = Vec::with_capacity(e.len() + 1);
    key.extend_from_slice(e);
    key.push(INDEX_SEPARATOR);
    key
}

/// Build the index key `email_bytes ++ 0x00 ++ member_bytes`.
pub(crate) fn index_key(email: &Email, member: &MemberId) -> Vec<u8> {
    let mut key = email_prefix(email);
    key.extend_from_slice(member.as_str().as_bytes());
    key
}

/// Split an index key back into its member id.
pub(crate) fn member_from_index_key(key: &[u8]) -> Result<MemberId, StoreError> {
    let pos = key
        .iter()
        .position(|b| *b == INDEX_SEPARATOR)
        .ok_or_else(|| StoreError::Corruption("email index key without separator".into()))?;
    let raw = std::str::from_utf8(&key[pos + 1..])
        .map_err(|e| StoreError::Corruption(format!("email index key not utf-8: {e}")))?;
    MemberId::new(raw).map_err(|e| StoreError::Corruption(e.to_string()))
}

impl LmdbIdentityStore {
    fn read(&self, txn: &RoTxn, member: &MemberId) -> Result<Option<VerificationRecord>, StoreError> {
        let val = self
            .records_db
            .get(txn, member.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        val.map(decode_record).transpose()
    }

    fn claimants(&self, txn: &RoTxn, email: &Email) -> Result<Vec<MemberId>, StoreError> {
        let prefix = email_prefix(email);
        let iter = self
            .email_index_db
            .prefix_iter(txn, &prefix)
            .map_err(LmdbError::from)?;
        let mut members = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(LmdbError::from)?;
            members.push(member_from_index_key(key)?);
        }
        Ok(members)
    }

    fn write(
        &self,
        txn: &mut RwTxn,
        previous: Option<&VerificationRecord>,
        record: &VerificationRecord,
    ) -> Result<(), StoreError> {
        let old_email = previous.and_then(|p| p.email.as_ref());
        if old_email != record.email.as_ref() {
            if let Some(old) = old_email {
                self.email_index_db
                    .delete(txn, &index_key(old, &record.member_id))
                    .map_err(LmdbError::from)?;
            }
            if let Some(new) = record.email.as_ref() {
                self.email_index_db
                    .put(txn, &index_key(new, &record.member_id), &[])
                    .map_err(LmdbError::from)?;
            }
        }
        let bytes = encode_record(record)?;
        self.records_db
            .put(txn, record.member_id.as_str().as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Read-modify-write of one record inside a single write transaction.
    fn modify(
        &self,
        member: &MemberId,
        change: impl FnOnce(&mut VerificationRecord),
    ) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let Some(existing) = self.read(&wtxn, member)? else {
            return Ok(false);
        };
        let mut updated = existing.clone();
        change(&mut updated);
        updated.revision = existing.revision + 1;
        self.write(&mut wtxn, Some(&existing), &updated)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }
}

impl IdentityStore for LmdbIdentityStore {
    fn get(&self, member: &MemberId) -> Result<Option<VerificationRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        self.read(&rtxn, member)
    }

    fn get_by_email(&self, email: &Email) -> Result<Option<VerificationRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        for member in self.claimants(&rtxn, email)? {
            if let Some(record) = self.read(&rtxn, &member)? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn get_many_by_email_excluding(
        &self,
        email: &Email,
        exclude: &MemberId,
    ) -> Result<Vec<VerificationRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut records = Vec::new();
        for member in self.claimants(&rtxn, email)? {
            if &member == exclude {
                continue;
            }
            if let Some(record) = self.read(&rtxn, &member)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn upsert(&self, record: &VerificationRecord) -> Result<VerificationRecord, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let existing = self.read(&wtxn, &record.member_id)?;
        let found = existing.as_ref().map(|r| r.revision).unwrap_or(0);
        if found != record.revision {
            return Err(StoreError::Conflict {
                member: record.member_id.clone(),
                expected: record.revision,
                found,
            });
        }
        let mut stored = record.clone();
        stored.revision = found + 1;
        self.write(&mut wtxn, existing.as_ref(), &stored)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(stored)
    }

    fn set_banned(&self, member: &MemberId, banned: bool) -> Result<bool, StoreError> {
        self.modify(member, |r| r.banned = banned)
    }

    fn set_verified(&self, member: &MemberId, verified: bool) -> Result<bool, StoreError> {
        self.modify(member, |r| r.verified = verified)
    }

    fn delete(&self, member: &MemberId) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let Some(existing) = self.read(&wtxn, member)? else {
            return Ok(false);
        };
        if let Some(email) = existing.email.as_ref() {
            self.email_index_db
                .delete(&mut wtxn, &index_key(email, member))
                .map_err(LmdbError::from)?;
        }
        self.records_db
            .delete(&mut wtxn, member.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn set_last_export_request(
        &self,
        member: &MemberId,
        at: Timestamp,
    ) -> Result<bool, StoreError> {
        self.modify(member, |r| r.last_export_request_at = Some(at))
    }

    fn count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.records_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    fn temp_store() -> (tempfile::TempDir, LmdbIdentityStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 8, 16 * 1024 * 1024).expect("open env");
        (dir, env.identity_store())
    }

    fn member(id: &str) -> MemberId {
        MemberId::new(id).unwrap()
    }

    fn email(raw: &str) -> Email {
        Email::parse(raw).unwrap()
    }

    fn claimed(id: &str, raw: &str) -> VerificationRecord {
        let mut record = VerificationRecord::new(member(id));
        record.email = Some(email(raw));
        record
    }

    #[test]
    fn upsert_then_get() {
        let (_dir, store) = temp_store();
        let stored = store.upsert(&claimed("1", "a@uni.edu")).unwrap();
        assert_eq!(stored.revision, 1);
        assert_eq!(store.get(&member("1")).unwrap(), Some(stored));
        assert_eq!(store.get(&member("2")).unwrap(), None);
    }

    #[test]
    fn stale_revision_is_rejected() {
        let (_dir, store) = temp_store();
        let first = store.upsert(&claimed("1", "a@uni.edu")).unwrap();
        assert!(store.set_banned(&member("1"), true).unwrap());

        // `first` predates the ban; writing it back must not revert it.
        let err = store.upsert(&first).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, found: 2, .. }));
        assert!(store.get(&member("1")).unwrap().unwrap().banned);
    }

    #[test]
    fn fresh_record_with_nonzero_revision_conflicts() {
        let (_dir, store) = temp_store();
        let mut record = claimed("1", "a@uni.edu");
        record.revision = 4;
        assert!(store.upsert(&record).unwrap_err().is_conflict());
    }

    #[test]
    fn email_index_follows_claim_changes() {
        let (_dir, store) = temp_store();
        let mut record = store.upsert(&claimed("1", "a@uni.edu")).unwrap();
        store.upsert(&claimed("2", "a@uni.edu")).unwrap();

        let others = store
            .get_many_by_email_excluding(&email("a@uni.edu"), &member("2"))
            .unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].member_id, member("1"));

        record.email = Some(email("b@uni.edu"));
        store.upsert(&record).unwrap();
        let others = store
            .get_many_by_email_excluding(&email("a@uni.edu"), &member("2"))
            .unwrap();
        assert!(others.is_empty());
        assert_eq!(
            store.get_by_email(&email("b@uni.edu")).unwrap().unwrap().member_id,
            member("1")
        );
    }

    #[test]
    fn email_prefix_does_not_match_longer_address() {
        let (_dir, store) = temp_store();
        store.upsert(&claimed("1", "a@uni.edu.au")).unwrap();
        assert!(store.get_by_email(&email("a@uni.edu")).unwrap().is_none());
    }

    #[test]
    fn narrow_setters_report_missing_records() {
        let (_dir, store) = temp_store();
        assert!(!store.set_banned(&member("9"), true).unwrap());
        assert!(!store.set_verified(&member("9"), true).unwrap());
        assert!(!store
            .set_last_export_request(&member("9"), Timestamp::new(1))
            .unwrap());
    }

    #[test]
    fn narrow_setter_preserves_other_fields() {
        let (_dir, store) = temp_store();
        let mut record = claimed("1", "a@uni.edu");
        record.verified = true;
        store.upsert(&record).unwrap();

        store.set_banned(&member("1"), true).unwrap();
        store
            .set_last_export_request(&member("1"), Timestamp::new(77))
            .unwrap();

        let stored = store.get(&member("1")).unwrap().unwrap();
        assert!(stored.verified);
        assert!(stored.banned);
        assert_eq!(stored.last_export_request_at, Some(Timestamp::new(77)));
        assert_eq!(stored.revision, 3);
    }

    #[test]
    fn delete_removes_record_and_index() {
        let (_dir, store) = temp_store();
        store.upsert(&claimed("1", "a@uni.edu")).unwrap();
        assert!(store.delete(&member("1")).unwrap());
        assert!(!store.delete(&member("1")).unwrap());
        assert!(store.get_by_email(&email("a@uni.edu")).unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn index_key_splits_back_to_member() {
        let key = index_key(&email("a@uni.edu"), &member("123"));
        assert_eq!(member_from_index_key(&key).unwrap(), member("123"));
    }
}
