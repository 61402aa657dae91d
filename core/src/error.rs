use thiserror::Error;

use crate::types::guardrails::GuardrailError;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    GuardrailError(#[from] GuardrailError),

    #[error("Failed to parse JSON")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("{0}")]
    CustomError(String),
}

impl GatewayError {
    /// True when a guardrail stopped the call, as opposed to a failure
    pub fn is_guardrail_block(&self) -> bool {
        matches!(
            self,
            GatewayError::GuardrailError(GuardrailError::Blocked { .. })
        )
    }
}
