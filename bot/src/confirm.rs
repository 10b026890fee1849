//! Time-bounded confirm/cancel prompts.

use std::sync::Arc;
use std::time::Duration;

use kahukura_platform::{ConfirmationChoice, ConfirmationPrompt};
use kahukura_types::MemberId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
    /// Nobody answered within the timeout. Treated as a cancel.
    TimedOut,
}

impl Confirmation {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// Wraps a [`ConfirmationPrompt`] with the hard answer deadline.
pub struct ConfirmationGate {
    prompt: Arc<dyn ConfirmationPrompt>,
    timeout: Duration,
}

impl ConfirmationGate {
    pub fn new(prompt: Arc<dyn ConfirmationPrompt>, timeout: Duration) -> Self {
        Self { prompt, timeout }
    }

    pub async fn confirm(&self, invoker: &MemberId, prompt: &str) -> Confirmation {
        match tokio::time::timeout(self.timeout, self.prompt.ask(invoker, prompt)).await {
            Ok(Ok(ConfirmationChoice::Confirm)) => Confirmation::Confirmed,
            Ok(Ok(ConfirmationChoice::Cancel)) => Confirmation::Cancelled,
            Ok(Err(e)) => {
                tracing::warn!(member = %invoker, error = %e, "confirmation prompt failed, cancelling");
                Confirmation::Cancelled
            }
            Err(_) => {
                tracing::debug!(member = %invoker, "confirmation timed out");
                Confirmation::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kahukura_nullables::NullConfirmationPrompt;
    use kahukura_platform::PlatformError;

    fn member() -> MemberId {
        MemberId::new("1").unwrap()
    }

    fn gate(prompt: NullConfirmationPrompt) -> ConfirmationGate {
        ConfirmationGate::new(Arc::new(prompt), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn answers_pass_through() {
        let gate = gate(NullConfirmationPrompt::new(vec![
            Ok(ConfirmationChoice::Confirm),
            Ok(ConfirmationChoice::Cancel),
        ]));
        assert_eq!(gate.confirm(&member(), "sure?").await, Confirmation::Confirmed);
        assert_eq!(gate.confirm(&member(), "sure?").await, Confirmation::Cancelled);
    }

    #[tokio::test]
    async fn prompt_error_cancels() {
        let gate = gate(NullConfirmationPrompt::new(vec![Err(PlatformError::Unreachable(
            "down".into(),
        ))]));
        assert_eq!(gate.confirm(&member(), "sure?").await, Confirmation::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_times_out_after_sixty_seconds() {
        let gate = gate(NullConfirmationPrompt::silent());
        let started = tokio::time::Instant::now();
        assert_eq!(gate.confirm(&member(), "sure?").await, Confirmation::TimedOut);
        assert!(started.elapsed() >= Duration::from_secs(60));
    }
}
