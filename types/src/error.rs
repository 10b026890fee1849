//! Top-level error type shared across crates.

use thiserror::Error;

/// Errors raised while constructing the shared types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid member id: {0:?}")]
    InvalidMemberId(String),

    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),
}
