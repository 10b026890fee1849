//! Confirm/cancel prompts shown to the invoking member.

use async_trait::async_trait;
use kahukura_types::MemberId;
use serde::{Deserialize, Serialize};

use crate::PlatformError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationChoice {
    Confirm,
    Cancel,
}

#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    /// Show `prompt` to `invoker` and wait for their answer. May wait
    /// indefinitely; callers bound it with a timeout.
    async fn ask(&self, invoker: &MemberId, prompt: &str) -> Result<ConfirmationChoice, PlatformError>;
}
