use kahukura_types::MemberId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    /// Optimistic revision check failed: someone else wrote the record first.
    #[error("revision conflict on {member}: expected {expected}, found {found}")]
    Conflict {
        member: MemberId,
        expected: u64,
        found: u64,
    },

    #[error("record schema {found} is newer than supported {supported}")]
    SchemaMismatch { found: u16, supported: u16 },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    /// Whether re-reading and retrying the write may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
