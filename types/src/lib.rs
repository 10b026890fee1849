//! Fundamental types for the Kahukura verification bot.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! member identifiers, normalized emails, timestamps, verification records and
//! moderation log entries.

pub mod email;
pub mod error;
pub mod member;
pub mod moderation;
pub mod record;
pub mod time;

pub use email::Email;
pub use error::TypesError;
pub use member::MemberId;
pub use moderation::{ActionDuration, Actor, ModerationAction, ModerationLogEntry};
pub use record::{ManualOverride, PendingCode, VerificationRecord, CURRENT_RECORD_SCHEMA};
pub use time::{Clock, SystemClock, Timestamp};
