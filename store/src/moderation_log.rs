//! Moderation audit trail storage trait.

use crate::StoreError;
use kahukura_types::{MemberId, ModerationLogEntry};

/// A log entry together with its store-assigned id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredModerationEntry {
    pub id: u64,
    pub entry: ModerationLogEntry,
}

/// Append-only storage of moderation actions.
pub trait ModerationLogStore: Send + Sync {
    /// Append an entry and return its id. Ids increase monotonically.
    fn append(&self, entry: &ModerationLogEntry) -> Result<u64, StoreError>;

    /// Most recent entries first, optionally only those targeting `target`.
    fn recent(
        &self,
        target: Option<&MemberId>,
        limit: usize,
    ) -> Result<Vec<StoredModerationEntry>, StoreError>;
}
