//! Messages to members.

use async_trait::async_trait;
use kahukura_types::MemberId;

use crate::PlatformError;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Private message to one member. Fails when they have DMs disabled.
    async fn send_direct(&self, member: &MemberId, text: &str) -> Result<(), PlatformError>;

    /// Post in the channel quarantined members can still see.
    async fn send_to_fallback_channel(&self, text: &str) -> Result<(), PlatformError>;
}
