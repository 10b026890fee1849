//! LMDB storage backend for the Kahukura verification bot.
//!
//! Implements the storage traits from `kahukura-store` using the `heed` LMDB
//! bindings. Each logical store maps to one or more named databases within a
//! single environment.

pub mod codec;
pub mod environment;
pub mod error;
pub mod identity;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod moderation_log;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use identity::LmdbIdentityStore;
pub use meta::LmdbMetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use moderation_log::LmdbModerationLogStore;
