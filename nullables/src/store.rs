//! Nullable stores: thread-safe in-memory storage for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use kahukura_store::{IdentityStore, ModerationLogStore, StoreError, StoredModerationEntry};
use kahukura_types::{
    Email, MemberId, ModerationLogEntry, Timestamp, VerificationRecord, CURRENT_RECORD_SCHEMA,
};

/// An in-memory identity store with the same revision semantics as the
/// LMDB backend.
///
/// Records are kept in member-id order, so "first match" lookups are
/// deterministic.
pub struct NullIdentityStore {
    records: Mutex<BTreeMap<String, VerificationRecord>>,
    unavailable: AtomicBool,
    forced_conflicts: AtomicU32,
}

impl NullIdentityStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            unavailable: AtomicBool::new(false),
            forced_conflicts: AtomicU32::new(0),
        }
    }

    /// Seed a record as if it had been written once. Returns the stored copy.
    pub fn insert(&self, mut record: VerificationRecord) -> VerificationRecord {
        let mut records = self.records.lock().unwrap();
        let found = records
            .get(record.member_id.as_str())
            .map(|r| r.revision)
            .unwrap_or(0);
        record.revision = found + 1;
        records.insert(record.member_id.as_str().to_string(), record.clone());
        record
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the next `n` upserts fail with [`StoreError::Conflict`], as if a
    /// concurrent writer had won each time.
    pub fn force_conflicts(&self, n: u32) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    /// All records, in member-id order.
    pub fn all(&self) -> Vec<VerificationRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    /// Verified records claiming `email`.
    pub fn verified_with_email(&self, email: &Email) -> Vec<MemberId> {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.verified && r.claims(email))
            .map(|r| r.member_id.clone())
            .collect()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null store switched off".into()));
        }
        Ok(())
    }

    fn modify(
        &self,
        member: &MemberId,
        change: impl FnOnce(&mut VerificationRecord),
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(member.as_str()) else {
            return Ok(false);
        };
        change(record);
        record.revision += 1;
        Ok(true)
    }
}

impl Default for NullIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for NullIdentityStore {
    fn get(&self, member: &MemberId) -> Result<Option<VerificationRecord>, StoreError> {
        self.check_available()?;
        Ok(self.records.lock().unwrap().get(member.as_str()).cloned())
    }

    fn get_by_email(&self, email: &Email) -> Result<Option<VerificationRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.claims(email))
            .cloned())
    }

    fn get_many_by_email_excluding(
        &self,
        email: &Email,
        exclude: &MemberId,
    ) -> Result<Vec<VerificationRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.claims(email) && &r.member_id != exclude)
            .cloned()
            .collect())
    }

    fn upsert(&self, record: &VerificationRecord) -> Result<VerificationRecord, StoreError> {
        self.check_available()?;
        let mut records = self.records.lock().unwrap();
        let found = records
            .get(record.member_id.as_str())
            .map(|r| r.revision)
            .unwrap_or(0);
        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced || found != record.revision {
            return Err(StoreError::Conflict {
                member: record.member_id.clone(),
                expected: record.revision,
                found,
            });
        }
        let mut stored = record.clone();
        stored.revision = found + 1;
        stored.schema_version = CURRENT_RECORD_SCHEMA;
        records.insert(stored.member_id.as_str().to_string(), stored.clone());
        Ok(stored)
    }

    fn set_banned(&self, member: &MemberId, banned: bool) -> Result<bool, StoreError> {
        self.modify(member, |r| r.banned = banned)
    }

    fn set_verified(&self, member: &MemberId, verified: bool) -> Result<bool, StoreError> {
        self.modify(member, |r| r.verified = verified)
    }

    fn delete(&self, member: &MemberId) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.records.lock().unwrap().remove(member.as_str()).is_some())
    }

    fn set_last_export_request(
        &self,
        member: &MemberId,
        at: Timestamp,
    ) -> Result<bool, StoreError> {
        self.modify(member, |r| r.last_export_request_at = Some(at))
    }

    fn count(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self.records.lock().unwrap().len() as u64)
    }
}

/// An in-memory moderation log.
pub struct NullModerationLogStore {
    entries: Mutex<Vec<StoredModerationEntry>>,
}

impl NullModerationLogStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Vec<ModerationLogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|stored| stored.entry.clone())
            .collect()
    }
}

impl Default for NullModerationLogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ModerationLogStore for NullModerationLogStore {
    fn append(&self, entry: &ModerationLogEntry) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let id = entries.len() as u64 + 1;
        entries.push(StoredModerationEntry {
            id,
            entry: entry.clone(),
        });
        Ok(id)
    }

    fn recent(
        &self,
        target: Option<&MemberId>,
        limit: usize,
    ) -> Result<Vec<StoredModerationEntry>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|stored| target.map_or(true, |t| &stored.entry.target == t))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kahukura_types::{Actor, ModerationAction};

    fn member(id: &str) -> MemberId {
        MemberId::new(id).unwrap()
    }

    #[test]
    fn upsert_checks_revision() {
        let store = NullIdentityStore::new();
        let stored = store.upsert(&VerificationRecord::new(member("1"))).unwrap();
        assert_eq!(stored.revision, 1);

        assert!(store.set_banned(&member("1"), true).unwrap());
        let err = store.upsert(&stored).unwrap_err();
        assert!(err.is_conflict());
        assert!(store.get(&member("1")).unwrap().unwrap().banned);
    }

    #[test]
    fn forced_conflicts_run_out() {
        let store = NullIdentityStore::new();
        store.force_conflicts(1);
        let record = VerificationRecord::new(member("1"));
        assert!(store.upsert(&record).unwrap_err().is_conflict());
        assert!(store.upsert(&record).is_ok());
    }

    #[test]
    fn unavailable_fails_every_call() {
        let store = NullIdentityStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.get(&member("1")),
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.get(&member("1")).unwrap().is_none());
    }

    #[test]
    fn email_lookups_exclude_requested_member() {
        let store = NullIdentityStore::new();
        let email = Email::parse("a@uni.edu").unwrap();
        for id in ["1", "2", "3"] {
            let mut record = VerificationRecord::new(member(id));
            record.email = (id != "3").then(|| email.clone());
            store.insert(record);
        }
        assert_eq!(
            store.get_by_email(&email).unwrap().unwrap().member_id,
            member("1")
        );
        let others = store.get_many_by_email_excluding(&email, &member("1")).unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].member_id, member("2"));
    }

    #[test]
    fn moderation_log_newest_first() {
        let log = NullModerationLogStore::new();
        for (i, target) in ["1", "2", "1"].into_iter().enumerate() {
            let entry = ModerationLogEntry::new(
                ModerationAction::Warn,
                member(target),
                Actor::System,
                format!("w{i}"),
                Timestamp::new(i as u64),
            );
            log.append(&entry).unwrap();
        }
        let recent = log.recent(Some(&member("1")), 10).unwrap();
        assert_eq!(
            recent.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![3, 1]
        );
        assert_eq!(log.recent(None, 1).unwrap()[0].id, 3);
    }
}
