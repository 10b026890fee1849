//! LMDB implementation of ModerationLogStore.
//!
//! Keys are big-endian `u64` ids so LMDB's byte ordering is id ordering and
//! "most recent first" is a reverse scan.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use kahukura_store::{ModerationLogStore, StoreError, StoredModerationEntry};
use kahukura_types::{MemberId, ModerationLogEntry};

use crate::LmdbError;

#[derive(Clone)]
pub struct LmdbModerationLogStore {
    pub(crate) env: Arc<Env>,
    pub(crate) log_db: Database<Bytes, Bytes>,
}

fn decode_id(key: &[u8]) -> Result<u64, StoreError> {
    let arr: [u8; 8] = key
        .try_into()
        .map_err(|_| StoreError::Corruption(format!("log key has {} bytes", key.len())))?;
    Ok(u64::from_be_bytes(arr))
}

impl ModerationLogStore for LmdbModerationLogStore {
    fn append(&self, entry: &ModerationLogEntry) -> Result<u64, StoreError> {
        let bytes = bincode::serialize(entry).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let next = match self.log_db.last(&wtxn).map_err(LmdbError::from)? {
            Some((key, _)) => decode_id(key)? + 1,
            None => 1,
        };
        self.log_db
            .put(&mut wtxn, &next.to_be_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(next)
    }

    fn recent(
        &self,
        target: Option<&MemberId>,
        limit: usize,
    ) -> Result<Vec<StoredModerationEntry>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.log_db.rev_iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for result in iter {
            if results.len() >= limit {
                break;
            }
            let (key, val) = result.map_err(LmdbError::from)?;
            let entry: ModerationLogEntry = bincode::deserialize(val).map_err(LmdbError::from)?;
            if target.is_some_and(|t| &entry.target != t) {
                continue;
            }
            results.push(StoredModerationEntry {
                id: decode_id(key)?,
                entry,
            });
        }
        Ok(results)
    }
}
