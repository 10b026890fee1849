//! The Kahukura verification bot.
//!
//! Members join quarantined, verify an institutional email with a mailed
//! code, and are released. The [`Bot`] wires the verification state
//! machine, join admission, data rights and moderation over the store and
//! platform capabilities it is given.

pub mod admission;
pub mod audit;
pub mod authz;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod conflict;
pub mod data_rights;
pub mod error;
pub mod events;
pub mod issuer;
pub mod machine;
pub mod messages;
pub mod metrics;
pub mod moderation;
pub mod notify;
pub mod rules;

pub use admission::{AdmissionController, AdmissionOutcome};
pub use audit::StoreAuditLog;
pub use authz::{Authorizer, Invoker, Role};
pub use commands::{Bot, BotCommand, Collaborators, CommandReply};
pub use config::BotConfig;
pub use confirm::{Confirmation, ConfirmationGate};
pub use conflict::{ConflictResolver, SweepReport};
pub use data_rights::{DataRights, DeleteOutcome, ExportOutcome, LookupOutcome, MemberSummary};
pub use error::BotError;
pub use events::{EventOutcome, PlatformEvent};
pub use machine::{BanSyncOutcome, ManualVerifyOutcome, RequestOutcome, SubmitOutcome, VerificationMachine};
pub use messages::Messages;
pub use metrics::BotMetrics;
pub use moderation::{ModerationOutcome, ModerationService};
pub use notify::Delivery;
pub use rules::Rules;

/// Attempts at an optimistic write before giving up with
/// [`BotError::WriteContention`].
pub const MAX_WRITE_ATTEMPTS: u32 = 3;
