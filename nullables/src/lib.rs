//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the bot (clock, code source, storage, chat
//! platform, mail, audit trail) sits behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including failure injection
//! - Record every call for assertions
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod platform;
pub mod random;
pub mod store;

pub use clock::NullClock;
pub use platform::{
    MembershipCall, NullAuditLog, NullConfirmationPrompt, NullMailer, NullMembership, NullNotifier,
};
pub use random::NullCodeSource;
pub use store::{NullIdentityStore, NullModerationLogStore};
