//! Moderation audit trail entries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{MemberId, Timestamp};

/// Kind of punitive (or reversing) action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Ban,
    Kick,
    Timeout,
    Unban,
    Untimeout,
    Warn,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ban => "Ban",
            Self::Kick => "Kick",
            Self::Timeout => "Timeout",
            Self::Unban => "Unban",
            Self::Untimeout => "Untimeout",
            Self::Warn => "Warn",
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed an action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Member(MemberId),
    /// The bot itself, e.g. a conflict sweep or ban-evasion check.
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(id) => write!(f, "{id}"),
            Self::System => f.write_str("system"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDuration {
    pub length_secs: u64,
    pub expires_at: Timestamp,
}

/// Append-only record of a moderation action. Never mutated once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationLogEntry {
    pub action: ModerationAction,
    pub target: MemberId,
    pub moderator: Actor,
    pub reason: String,
    pub timestamp: Timestamp,
    pub duration: Option<ActionDuration>,
}

impl ModerationLogEntry {
    pub fn new(
        action: ModerationAction,
        target: MemberId,
        moderator: Actor,
        reason: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            action,
            target,
            moderator,
            reason: reason.into(),
            timestamp,
            duration: None,
        }
    }

    /// Attach a duration starting at the entry's timestamp.
    pub fn with_duration(mut self, length_secs: u64) -> Self {
        self.duration = Some(ActionDuration {
            length_secs,
            expires_at: self.timestamp.plus_secs(length_secs),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_expiry_is_relative_to_timestamp() {
        let entry = ModerationLogEntry::new(
            ModerationAction::Timeout,
            MemberId::new("9").unwrap(),
            Actor::System,
            "spam",
            Timestamp::new(100),
        )
        .with_duration(60);
        let duration = entry.duration.unwrap();
        assert_eq!(duration.length_secs, 60);
        assert_eq!(duration.expires_at, Timestamp::new(160));
    }

    #[test]
    fn action_serializes_snake_case() {
        let json = serde_json::to_string(&ModerationAction::Untimeout).unwrap();
        assert_eq!(json, "\"untimeout\"");
    }
}
