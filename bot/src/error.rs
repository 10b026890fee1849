use kahukura_types::MemberId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("store error: {0}")]
    Store(#[from] kahukura_store::StoreError),

    #[error("platform error: {0}")]
    Platform(#[from] kahukura_platform::PlatformError),

    #[error("verification error: {0}")]
    Verification(#[from] kahukura_verification::VerificationError),

    #[error("config error: {0}")]
    Config(String),

    #[error("record for {0} kept changing underneath us; gave up after retries")]
    WriteContention(MemberId),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
