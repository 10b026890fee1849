use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("at least one accepted email domain is required")]
    NoAcceptedDomains,

    #[error("invalid accepted domain: {0:?}")]
    InvalidDomain(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
