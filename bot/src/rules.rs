use kahukura_types::Timestamp;
use kahukura_verification::{DecisionContext, DomainPolicy, VerificationParams};

/// Domain policy and timing parameters, fixed at startup.
#[derive(Clone, Debug)]
pub struct Rules {
    pub policy: DomainPolicy,
    pub params: VerificationParams,
}

impl Rules {
    pub fn new(policy: DomainPolicy, params: VerificationParams) -> Self {
        Self { policy, params }
    }

    pub fn at(&self, now: Timestamp) -> DecisionContext<'_> {
        DecisionContext {
            policy: &self.policy,
            params: &self.params,
            now,
        }
    }
}
