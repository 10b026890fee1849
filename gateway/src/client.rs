//! Platform capabilities over HTTP to the chat-platform bridge.
//!
//! Every call is `POST {bridge_url}/v1/...` with a JSON body, except the
//! membership check which is a `GET`. A non-2xx answer is a refusal by the
//! platform; a connect failure or timeout means the bridge is unreachable.

use std::time::Duration;

use async_trait::async_trait;
use kahukura_platform::{
    ConfirmationChoice, ConfirmationPrompt, DataExport, Mailer, Membership, Notifier, PlatformError,
};
use kahukura_types::{Email, MemberId};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::GatewayError;
use crate::wire::{
    BridgeErrorBody, ChannelMessage, CodeMail, DirectMessage, ExportMail, MembershipStatus,
    PromptAnswer, PromptRequest, ReasonBody, TimeoutBody,
};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra time a prompt request is given over the confirmation timeout, so
/// the bot's own deadline fires first.
const PROMPT_GRACE: Duration = Duration::from_secs(5);

pub struct BridgeClient {
    base_url: String,
    http_client: reqwest::Client,
    prompt_timeout: Duration,
}

impl BridgeClient {
    /// `timeout` bounds ordinary requests; prompts wait up to
    /// `confirmation_timeout` plus a grace period.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        confirmation_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(GatewayError::InvalidBridgeUrl(base_url.to_string()));
        }
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            prompt_timeout: confirmation_timeout + PROMPT_GRACE,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), PlatformError> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_send_error)?;
        check_status(response).await.map(|_| ())
    }

    async fn post_for<B, T>(&self, path: &str, body: &B, timeout: Duration) -> Result<T, PlatformError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(self.url(path))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(map_send_error)?;
        decode(check_status(response).await?).await
    }

    async fn get_for<T: DeserializeOwned>(&self, path: &str) -> Result<T, PlatformError> {
        let response = self
            .http_client
            .get(self.url(path))
            .send()
            .await
            .map_err(map_send_error)?;
        decode(check_status(response).await?).await
    }
}

fn map_send_error(e: reqwest::Error) -> PlatformError {
    if e.is_timeout() {
        PlatformError::Unreachable(format!("request timed out: {e}"))
    } else if e.is_connect() {
        PlatformError::Unreachable(format!("connection failed: {e}"))
    } else {
        PlatformError::InvalidResponse(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.json::<BridgeErrorBody>().await.unwrap_or_default();
    if body.error.is_empty() {
        Err(PlatformError::Rejected(format!("HTTP status {status}")))
    } else {
        Err(PlatformError::Rejected(body.error))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PlatformError> {
    response
        .json()
        .await
        .map_err(|e| PlatformError::InvalidResponse(format!("failed to parse bridge response: {e}")))
}

fn reason(reason: &str) -> ReasonBody {
    ReasonBody {
        reason: reason.to_string(),
    }
}

#[async_trait]
impl Membership for BridgeClient {
    async fn add_restriction(&self, member: &MemberId) -> Result<(), PlatformError> {
        self.post(&format!("members/{member}/restriction/add"), &serde_json::json!({})).await
    }

    async fn remove_restriction(&self, member: &MemberId) -> Result<(), PlatformError> {
        self.post(&format!("members/{member}/restriction/remove"), &serde_json::json!({})).await
    }

    async fn evict(&self, member: &MemberId, why: &str) -> Result<(), PlatformError> {
        self.post(&format!("members/{member}/evict"), &reason(why)).await
    }

    async fn ban(&self, member: &MemberId, why: &str) -> Result<(), PlatformError> {
        self.post(&format!("members/{member}/ban"), &reason(why)).await
    }

    async fn unban(&self, member: &MemberId, why: &str) -> Result<(), PlatformError> {
        self.post(&format!("members/{member}/unban"), &reason(why)).await
    }

    async fn timeout(&self, member: &MemberId, duration_secs: u64, why: &str) -> Result<(), PlatformError> {
        let body = TimeoutBody {
            duration_secs,
            reason: why.to_string(),
        };
        self.post(&format!("members/{member}/timeout"), &body).await
    }

    async fn remove_timeout(&self, member: &MemberId, why: &str) -> Result<(), PlatformError> {
        self.post(&format!("members/{member}/timeout/remove"), &reason(why)).await
    }

    async fn is_member(&self, member: &MemberId) -> Result<bool, PlatformError> {
        let status: MembershipStatus = self.get_for(&format!("members/{member}")).await?;
        Ok(status.member)
    }
}

#[async_trait]
impl Notifier for BridgeClient {
    async fn send_direct(&self, member: &MemberId, text: &str) -> Result<(), PlatformError> {
        let body = DirectMessage {
            member: member.clone(),
            text: text.to_string(),
        };
        self.post("messages/direct", &body).await
    }

    async fn send_to_fallback_channel(&self, text: &str) -> Result<(), PlatformError> {
        self.post(
            "messages/fallback",
            &ChannelMessage {
                text: text.to_string(),
            },
        )
        .await
    }
}

#[async_trait]
impl Mailer for BridgeClient {
    async fn send_code(&self, email: &Email, code: u32) -> Result<(), PlatformError> {
        let body = CodeMail {
            email: email.clone(),
            code,
        };
        self.post("mail/code", &body).await
    }

    async fn send_data_export(&self, email: &Email, export: &DataExport) -> Result<(), PlatformError> {
        let body = ExportMail {
            email: email.clone(),
            export: export.clone(),
        };
        self.post("mail/export", &body).await
    }
}

#[async_trait]
impl ConfirmationPrompt for BridgeClient {
    async fn ask(&self, invoker: &MemberId, prompt: &str) -> Result<ConfirmationChoice, PlatformError> {
        let body = PromptRequest {
            invoker: invoker.clone(),
            prompt: prompt.to_string(),
        };
        let answer: PromptAnswer = self.post_for("prompts", &body, self.prompt_timeout).await?;
        Ok(answer.choice)
    }
}
