use serde_json::Value;

use crate::types::gateway::ChatCompletionResponse;
use crate::types::guardrails::{GuardrailError, GuardrailEventHooks};

/// A named policy that can inspect, rewrite or block a call.
///
/// `data` is the JSON form of the request (`model`, `messages`, `metadata`..).
#[async_trait::async_trait]
pub trait Guardrail: Send + Sync {
    fn guardrail_name(&self) -> &str;

    /// Hooks this guardrail is registered for
    fn event_hooks(&self) -> Vec<GuardrailEventHooks>;

    fn default_on(&self) -> bool {
        false
    }

    /// Whether this guardrail applies to `data` at `event_type`
    fn should_run_guardrail(&self, data: &Value, event_type: GuardrailEventHooks) -> bool;

    async fn pre_call(&self, _data: &mut Value) -> Result<(), GuardrailError> {
        Ok(())
    }

    async fn during_call(&self, _data: &Value) -> Result<(), GuardrailError> {
        Ok(())
    }

    async fn post_call(
        &self,
        _data: &Value,
        _response: &mut ChatCompletionResponse,
    ) -> Result<(), GuardrailError> {
        Ok(())
    }
}
