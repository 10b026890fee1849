//! Moderation audit trail.

use async_trait::async_trait;
use kahukura_types::ModerationLogEntry;

/// Fire-and-forget sink for moderation actions. Implementations handle and
/// log their own failures; callers never depend on the outcome.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record_moderation_action(&self, entry: ModerationLogEntry);
}
