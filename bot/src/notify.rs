//! Member notification with channel fallback.

use kahukura_platform::Notifier;
use kahukura_types::MemberId;

/// Where a notification ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Direct,
    FallbackChannel,
    /// Neither path worked.
    Failed,
}

/// Try a direct message first, then the fallback channel.
///
/// `fallback_text` is what gets posted publicly; it should mention the
/// member rather than repeat anything private.
pub async fn deliver_with_fallback(
    notifier: &dyn Notifier,
    member: &MemberId,
    text: &str,
    fallback_text: &str,
) -> Delivery {
    match notifier.send_direct(member, text).await {
        Ok(()) => return Delivery::Direct,
        Err(e) => tracing::debug!(member = %member, error = %e, "direct message failed, using fallback channel"),
    }
    match notifier.send_to_fallback_channel(fallback_text).await {
        Ok(()) => Delivery::FallbackChannel,
        Err(e) => {
            tracing::error!(member = %member, error = %e, "could not notify member directly or in the fallback channel");
            Delivery::Failed
        }
    }
}
