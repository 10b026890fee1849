//! JSON bodies exchanged with the platform bridge.

use kahukura_bot::{BotCommand, Invoker};
use kahukura_platform::{ConfirmationChoice, DataExport};
use kahukura_types::{Email, MemberId};
use serde::{Deserialize, Serialize};

/// `POST /v1/commands`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandRequest {
    pub invoker: Invoker,
    pub command: BotCommand,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReasonBody {
    pub reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeoutBody {
    pub duration_secs: u64,
    pub reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MembershipStatus {
    pub member: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectMessage {
    pub member: MemberId,
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodeMail {
    pub email: Email,
    pub code: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportMail {
    pub email: Email,
    pub export: DataExport,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptRequest {
    pub invoker: MemberId,
    pub prompt: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptAnswer {
    pub choice: ConfirmationChoice,
}

/// Error body returned for refused bridge requests.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BridgeErrorBody {
    #[serde(default)]
    pub error: String,
}
