use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The platform answered and refused (missing permission, unknown member, ...).
    #[error("rejected by platform: {0}")]
    Rejected(String),

    /// The platform could not be reached or did not answer in time.
    #[error("platform unreachable: {0}")]
    Unreachable(String),

    #[error("invalid platform response: {0}")]
    InvalidResponse(String),
}
