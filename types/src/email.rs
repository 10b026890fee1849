//! Normalized institutional email address.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// An email address, trimmed and lower-cased at construction.
///
/// Two claims on the same mailbox always compare equal, whatever casing the
/// member typed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LEN: usize = 254;

    /// Parse and normalize an address.
    ///
    /// Requires exactly one `@`, a non-empty local part, and a dotted domain
    /// with no empty labels. Whitespace anywhere is rejected.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let normalized = raw.trim().to_lowercase();
        let invalid = || TypesError::InvalidEmail(raw.to_string());

        if normalized.is_empty()
            || normalized.len() > Self::MAX_LEN
            || normalized.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(invalid());
        }

        let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') || !domain.contains('.') {
            return Err(invalid());
        }
        if domain.split('.').any(str::is_empty) {
            return Err(invalid());
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after `@`.
    pub fn domain(&self) -> &str {
        // Construction guarantees exactly one '@'.
        self.0.rsplit_once('@').map(|(_, d)| d).unwrap_or_default()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Email> for String {
    fn from(e: Email) -> Self {
        e.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let email = Email::parse("  Kia.Ora@MYVUW.ac.NZ ").unwrap();
        assert_eq!(email.as_str(), "kia.ora@myvuw.ac.nz");
        assert_eq!(email.domain(), "myvuw.ac.nz");
    }

    #[test]
    fn same_mailbox_compares_equal() {
        assert_eq!(
            Email::parse("A@uni.edu").unwrap(),
            Email::parse("a@UNI.EDU").unwrap()
        );
    }

    #[test]
    fn rejects_malformed() {
        for raw in [
            "",
            "no-at-sign",
            "@uni.edu",
            "a@",
            "a@localhost",
            "a@@uni.edu",
            "a@b@uni.edu",
            "a b@uni.edu",
            "a@uni..edu",
            "a@.uni.edu",
        ] {
            assert!(Email::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }
}
