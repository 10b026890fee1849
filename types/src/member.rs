//! Platform-assigned member identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// A community member's stable identifier, as assigned by the chat platform.
///
/// Opaque to the bot: it is only ever compared, stored and echoed back.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemberId(String);

impl MemberId {
    /// Longest identifier accepted. Platform snowflakes are ~20 digits.
    pub const MAX_LEN: usize = 64;

    /// Create a member id, rejecting empty, oversized or whitespace-bearing input.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if s.is_empty() || s.len() > Self::MAX_LEN || s.chars().any(char::is_whitespace) {
            return Err(TypesError::InvalidMemberId(s));
        }
        Ok(Self(s))
    }

    /// Return the raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the id as a platform mention.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for MemberId {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<MemberId> for String {
    fn from(id: MemberId) -> Self {
        id.0
    }
}
