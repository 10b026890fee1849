//! Verification rules for community members.
//!
//! Everything in this crate is pure: it decides what a member's record
//! should become and which side effects the caller must perform, but never
//! touches a store or the chat platform itself.
//!
//! - [`transition`] is the single authoritative transition table.
//! - [`code`] draws and checks six-digit codes.
//! - [`domain`] decides which institutional emails are accepted.

pub mod code;
pub mod domain;
pub mod error;
pub mod params;
pub mod state;
pub mod transition;

pub use code::{
    parse_code, pending_code, validate_code, CodeCheck, CodeSource, RandomCodeSource, CODE_MAX,
    CODE_MIN,
};
pub use domain::DomainPolicy;
pub use error::VerificationError;
pub use params::VerificationParams;
pub use state::VerificationStatus;
pub use transition::{
    decide, owned_by_banned_member, revocation_reason, Decision, DecisionContext, Effect, Rejection, Transition,
    TransitionKind, Trigger, BAN_EVASION_REASON,
};
