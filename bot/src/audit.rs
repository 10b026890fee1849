//! Audit log persisted to the moderation log store.

use std::sync::Arc;

use async_trait::async_trait;
use kahukura_platform::AuditLog;
use kahukura_store::ModerationLogStore;
use kahukura_types::ModerationLogEntry;

/// Writes each entry to the [`ModerationLogStore`] and logs a one-line
/// summary. Store failures are logged and swallowed.
pub struct StoreAuditLog {
    store: Arc<dyn ModerationLogStore>,
}

impl StoreAuditLog {
    pub fn new(store: Arc<dyn ModerationLogStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuditLog for StoreAuditLog {
    async fn record_moderation_action(&self, entry: ModerationLogEntry) {
        match self.store.append(&entry) {
            Ok(id) => tracing::info!(
                id,
                action = %entry.action,
                target = %entry.target,
                moderator = %entry.moderator,
                reason = %entry.reason,
                "moderation action recorded"
            ),
            Err(e) => tracing::error!(
                action = %entry.action,
                target = %entry.target,
                error = %e,
                "failed to persist moderation action"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kahukura_nullables::NullModerationLogStore;
    use kahukura_types::{Actor, MemberId, ModerationAction, Timestamp};

    #[tokio::test]
    async fn appends_to_store() {
        let store = Arc::new(NullModerationLogStore::new());
        let audit = StoreAuditLog::new(store.clone());
        audit
            .record_moderation_action(ModerationLogEntry::new(
                ModerationAction::Kick,
                MemberId::new("4").unwrap(),
                Actor::System,
                "test",
                Timestamp::new(10),
            ))
            .await;
        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ModerationAction::Kick);
    }
}
