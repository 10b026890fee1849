use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("unknown migration: {from} -> {to}")]
    UnknownMigration { from: u32, to: u32 },

    #[error("store error: {0}")]
    Store(String),
}

impl From<bincode::Error> for LmdbError {
    fn from(e: bincode::Error) -> Self {
        LmdbError::Serialization(e.to_string())
    }
}

impl From<kahukura_store::StoreError> for LmdbError {
    fn from(e: kahukura_store::StoreError) -> Self {
        LmdbError::Store(e.to_string())
    }
}

impl From<LmdbError> for kahukura_store::StoreError {
    fn from(e: LmdbError) -> Self {
        use kahukura_store::StoreError;
        match e {
            LmdbError::Heed(heed::Error::Io(io)) => StoreError::Unavailable(io.to_string()),
            LmdbError::Io(io) => StoreError::Unavailable(io.to_string()),
            LmdbError::Serialization(msg) => StoreError::Serialization(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}
