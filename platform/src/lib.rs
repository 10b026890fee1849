//! Capabilities the bot needs from the outside world.
//!
//! The chat platform, outbound mail and the moderation audit trail are
//! external collaborators. The bot only sees them through these traits,
//! implemented over HTTP by `kahukura-gateway` and in memory by
//! `kahukura-nullables`.

pub mod audit;
pub mod confirm;
pub mod error;
pub mod mail;
pub mod membership;
pub mod notify;

pub use audit::AuditLog;
pub use confirm::{ConfirmationChoice, ConfirmationPrompt};
pub use error::PlatformError;
pub use mail::{DataExport, Mailer};
pub use membership::Membership;
pub use notify::Notifier;
