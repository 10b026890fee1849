//! Abstract storage traits for the Kahukura verification bot.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits and receives
//! a store handle at construction time.

pub mod error;
pub mod identity;
pub mod meta;
pub mod moderation_log;

pub use error::StoreError;
pub use identity::IdentityStore;
pub use meta::MetaStore;
pub use moderation_log::{ModerationLogStore, StoredModerationEntry};
