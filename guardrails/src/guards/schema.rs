use jsonschema::{Draft, Validator};
use serde_json::Value;
use switchyard_core::types::gateway::ChatCompletionResponse;
use switchyard_core::types::guardrails::evaluator::Guardrail;
use switchyard_core::types::guardrails::{GuardrailError, GuardrailEventHooks, GuardrailSpec};

use crate::custom::CustomGuardrail;

/// Validates the model's answer against a JSON schema.
pub struct SchemaGuardrail {
    base: CustomGuardrail,
    validator: Validator,
}

impl SchemaGuardrail {
    pub fn new(base: CustomGuardrail, schema: &Value) -> Result<Self, GuardrailError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(schema)
            .map_err(|e| GuardrailError::InvalidConfig(format!("Invalid schema definition: {e}")))?;

        Ok(Self { base, validator })
    }

    pub fn from_spec(spec: &GuardrailSpec) -> Result<Self, GuardrailError> {
        let schema = spec
            .litellm_params
            .extra
            .get("schema")
            .ok_or_else(|| GuardrailError::InvalidConfig("schema is required".to_string()))?;

        Self::new(CustomGuardrail::from_spec(spec), schema)
    }

    pub fn validate(&self, text: &str) -> Result<(), GuardrailError> {
        let json_value = serde_json::from_str::<Value>(text).map_err(|e| {
            GuardrailError::blocked(&self.base.guardrail_name, format!("Invalid JSON: {e}"))
        })?;

        let error_messages: Vec<String> = self
            .validator
            .iter_errors(&json_value)
            .map(|err| err.to_string())
            .collect();

        if error_messages.is_empty() {
            Ok(())
        } else {
            Err(GuardrailError::blocked(
                &self.base.guardrail_name,
                error_messages.join("; "),
            ))
        }
    }
}

#[async_trait::async_trait]
impl Guardrail for SchemaGuardrail {
    fn guardrail_name(&self) -> &str {
        &self.base.guardrail_name
    }

    fn event_hooks(&self) -> Vec<GuardrailEventHooks> {
        self.base.event_hook.hooks()
    }

    fn default_on(&self) -> bool {
        self.base.default_on
    }

    fn should_run_guardrail(&self, data: &Value, event_type: GuardrailEventHooks) -> bool {
        self.base.should_run_guardrail(data, event_type)
    }

    async fn post_call(
        &self,
        _data: &Value,
        response: &mut ChatCompletionResponse,
    ) -> Result<(), GuardrailError> {
        let text = response.content().ok_or_else(|| {
            GuardrailError::blocked(&self.base.guardrail_name, "No content in response")
        })?;
        self.validate(text)
    }
}
