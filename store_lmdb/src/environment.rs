//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::identity::LmdbIdentityStore;
use crate::meta::LmdbMetaStore;
use crate::moderation_log::LmdbModerationLogStore;
use crate::LmdbError;

pub(crate) const RECORDS_DB: &str = "records";
pub(crate) const EMAIL_INDEX_DB: &str = "email_index";
pub(crate) const MODERATION_LOG_DB: &str = "moderation_log";
pub(crate) const META_DB: &str = "meta";

/// Wraps the LMDB environment and all database handles.
///
/// Store handles returned by the accessors share the environment and are
/// cheap to clone into every component that needs them.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    records_db: Database<Bytes, Bytes>,
    email_index_db: Database<Bytes, Bytes>,
    moderation_log_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process and the data
        // directory is owned by this bot; no other process maps it.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let records_db = env.create_database(&mut wtxn, Some(RECORDS_DB))?;
        let email_index_db = env.create_database(&mut wtxn, Some(EMAIL_INDEX_DB))?;
        let moderation_log_db = env.create_database(&mut wtxn, Some(MODERATION_LOG_DB))?;
        let meta_db = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            records_db,
            email_index_db,
            moderation_log_db,
            meta_db,
        })
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn identity_store(&self) -> LmdbIdentityStore {
        LmdbIdentityStore {
            env: Arc::clone(&self.env),
            records_db: self.records_db,
            email_index_db: self.email_index_db,
        }
    }

    pub fn moderation_log_store(&self) -> LmdbModerationLogStore {
        LmdbModerationLogStore {
            env: Arc::clone(&self.env),
            log_db: self.moderation_log_db,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kahukura_store::IdentityStore;

    #[test]
    fn open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let env = LmdbEnvironment::open(&nested, 8, 16 * 1024 * 1024).unwrap();
        assert!(nested.join("data.mdb").exists());
        assert_eq!(env.identity_store().count().unwrap(), 0);
    }
}
