//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the bot begins handling
//! joins and commands.

use std::path::Path;

use heed::types::Bytes;

use crate::codec::decode_record;
use crate::environment::{EMAIL_INDEX_DB, META_DB, MODERATION_LOG_DB, RECORDS_DB};
use crate::identity::{index_key, member_from_index_key};
use crate::{LmdbEnvironment, LmdbError};

/// Summary of an integrity check run.
#[derive(Debug)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Database names that we expect to exist in a valid environment.
const EXPECTED_DATABASES: &[&str] = &[RECORDS_DB, EMAIL_INDEX_DB, MODERATION_LOG_DB, META_DB];

/// Check LMDB database integrity on startup.
///
/// Counts every expected database, decodes every record, and cross-checks
/// the email index against the records in both directions. Problems are
/// collected in the report rather than failing the call.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport {
        databases_checked: 0,
        total_entries: 0,
        errors: Vec::new(),
    };

    let heed_env = env.env();
    let rtxn = heed_env.read_txn()?;

    for &db_name in EXPECTED_DATABASES {
        match heed_env.open_database::<Bytes, Bytes>(&rtxn, Some(db_name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{db_name}': {e}")),
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{db_name}' is missing")),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{db_name}': {e}")),
        }
    }

    let records = heed_env.open_database::<Bytes, Bytes>(&rtxn, Some(RECORDS_DB))?;
    let index = heed_env.open_database::<Bytes, Bytes>(&rtxn, Some(EMAIL_INDEX_DB))?;
    let (Some(records), Some(index)) = (records, index) else {
        return Ok(report);
    };

    // Every record decodes and its claim is indexed.
    for result in records.iter(&rtxn)? {
        let (key, val) = result?;
        let key_str = String::from_utf8_lossy(key);
        match decode_record(val) {
            Ok(record) => {
                if record.member_id.as_str().as_bytes() != key {
                    report
                        .errors
                        .push(format!("record under '{key_str}' names {}", record.member_id));
                }
                if let Some(email) = record.email.as_ref() {
                    if index.get(&rtxn, &index_key(email, &record.member_id))?.is_none() {
                        report
                            .errors
                            .push(format!("record '{key_str}' missing from email index"));
                    }
                }
            }
            Err(e) => report
                .errors
                .push(format!("record '{key_str}' undecodable: {e}")),
        }
    }

    // Every index entry points at a record that still makes that claim.
    for result in index.iter(&rtxn)? {
        let (key, _) = result?;
        let member = match member_from_index_key(key) {
            Ok(member) => member,
            Err(e) => {
                report.errors.push(format!("bad email index key: {e}"));
                continue;
            }
        };
        let claims = records
            .get(&rtxn, member.as_str().as_bytes())?
            .and_then(|val| decode_record(val).ok())
            .and_then(|record| record.email)
            .is_some_and(|email| index_key(&email, &member) == key);
        if !claims {
            report
                .errors
                .push(format!("dangling email index entry for member {member}"));
        }
    }

    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// a wrong path or a half-deleted store.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
