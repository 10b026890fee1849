//! Platform events pushed to the bot.

use kahukura_types::MemberId;
use serde::{Deserialize, Serialize};

use crate::admission::AdmissionOutcome;
use crate::machine::BanSyncOutcome;
use crate::{Bot, BotError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlatformEvent {
    MemberJoined { member: MemberId },
    /// A ban applied from the platform itself, outside the bot's commands.
    MemberBanned { member: MemberId },
    MemberUnbanned { member: MemberId },
}

impl PlatformEvent {
    pub fn member(&self) -> &MemberId {
        match self {
            Self::MemberJoined { member }
            | Self::MemberBanned { member }
            | Self::MemberUnbanned { member } => member,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Admission(AdmissionOutcome),
    BanSync(BanSyncOutcome),
}

impl Bot {
    pub async fn handle_event(&self, event: PlatformEvent) -> Result<EventOutcome, BotError> {
        let result = match &event {
            PlatformEvent::MemberJoined { member } => self
                .admission
                .on_member_joined(member)
                .await
                .map(EventOutcome::Admission),
            PlatformEvent::MemberBanned { member } => self
                .machine
                .on_platform_ban(member)
                .await
                .map(EventOutcome::BanSync),
            PlatformEvent::MemberUnbanned { member } => self
                .machine
                .on_platform_unban(member)
                .await
                .map(EventOutcome::BanSync),
        };
        if let Err(e) = &result {
            if matches!(e, BotError::Store(_) | BotError::WriteContention(_)) {
                self.metrics().store_errors.inc();
            }
            tracing::error!(member = %event.member(), error = %e, "event handling failed");
        }
        result
    }
}
