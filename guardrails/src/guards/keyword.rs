use serde_json::Value;
use switchyard_core::types::gateway::ChatCompletionResponse;
use switchyard_core::types::guardrails::evaluator::Guardrail;
use switchyard_core::types::guardrails::{GuardrailError, GuardrailEventHooks, GuardrailSpec};

use crate::custom::CustomGuardrail;

/// Blocks calls whose text contains a configured word (case-insensitive).
pub struct KeywordGuardrail {
    base: CustomGuardrail,
    blocked_words: Vec<String>,
}

impl KeywordGuardrail {
    pub fn new(base: CustomGuardrail, blocked_words: Vec<String>) -> Self {
        Self {
            base,
            blocked_words: blocked_words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn from_spec(spec: &GuardrailSpec) -> Result<Self, GuardrailError> {
        let words = spec
            .litellm_params
            .extra
            .get("blocked_words")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                GuardrailError::InvalidConfig("blocked_words must be a list".to_string())
            })?
            .iter()
            .map(|w| match w.as_str() {
                Some(word) if !word.trim().is_empty() => Ok(word.to_string()),
                _ => Err(GuardrailError::InvalidConfig(
                    "blocked_words must be non-empty strings".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if words.is_empty() {
            return Err(GuardrailError::InvalidConfig(
                "blocked_words is empty".to_string(),
            ));
        }

        Ok(Self::new(CustomGuardrail::from_spec(spec), words))
    }

    pub fn check(&self, text: &str) -> Result<(), GuardrailError> {
        let text = text.to_lowercase();
        match self.blocked_words.iter().find(|w| text.contains(w.as_str())) {
            Some(word) => Err(GuardrailError::blocked(
                &self.base.guardrail_name,
                format!("Blocked word detected: {word}"),
            )),
            None => Ok(()),
        }
    }

    fn last_user_message(data: &Value) -> Option<&str> {
        data.get("messages")?
            .as_array()?
            .iter()
            .rev()
            .find(|m| m.get("role").and_then(Value::as_str) == Some("user"))?
            .get("content")?
            .as_str()
    }
}

#[async_trait::async_trait]
impl Guardrail for KeywordGuardrail {
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

    async fn pre_call(&self, data: &mut Value) -> Result<(), GuardrailError> {
        match Self::last_user_message(data) {
            Some(text) => self.check(text),
            None => Ok(()),
        }
    }

    async fn during_call(&self, data: &Value) -> Result<(), GuardrailError> {
        match Self::last_user_message(data) {
            Some(text) => self.check(text),
            None => Ok(()),
        }
    }

    async fn post_call(
        &self,
        _data: &Value,
        response: &mut ChatCompletionResponse,
    ) -> Result<(), GuardrailError> {
        match response.content() {
            Some(text) => self.check(text),
            None => Ok(()),
        }
    }
}
