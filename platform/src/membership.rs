//! Community membership actions.

use async_trait::async_trait;
use kahukura_types::MemberId;

use crate::PlatformError;

#[async_trait]
pub trait Membership: Send + Sync {
    /// Place the member in quarantine.
    async fn add_restriction(&self, member: &MemberId) -> Result<(), PlatformError>;

    /// Lift quarantine.
    async fn remove_restriction(&self, member: &MemberId) -> Result<(), PlatformError>;

    /// Remove the member from the community. They may rejoin.
    async fn evict(&self, member: &MemberId, reason: &str) -> Result<(), PlatformError>;

    async fn ban(&self, member: &MemberId, reason: &str) -> Result<(), PlatformError>;

    async fn unban(&self, member: &MemberId, reason: &str) -> Result<(), PlatformError>;

    async fn timeout(
        &self,
        member: &MemberId,
        duration_secs: u64,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_timeout(&self, member: &MemberId, reason: &str) -> Result<(), PlatformError>;

    /// Whether the member is currently in the community.
    async fn is_member(&self, member: &MemberId) -> Result<bool, PlatformError>;
}
