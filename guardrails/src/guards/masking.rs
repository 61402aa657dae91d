use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use serde_json::Value;
use switchyard_core::events::callback_handler::{CallbackError, CustomLogger};
use switchyard_core::types::call::{CallKwargs, CallType};
use switchyard_core::types::gateway::ChatCompletionResponse;
use switchyard_core::types::guardrails::evaluator::Guardrail;
use switchyard_core::types::guardrails::{GuardrailError, GuardrailEventHooks, GuardrailSpec};

use crate::custom::CustomGuardrail;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex");
    static ref PHONE_REGEX: Regex =
        Regex::new(r"\+?\d[\d\s().-]{7,}\d").expect("valid phone regex");
}

/// Replaces pattern matches with `[LABEL]`.
///
/// Used as a `pre_call`/`post_call` guardrail it rewrites the live request
/// or response; registered for `logging_only` it acts as a logger and only
/// touches the logged copy.
pub struct MaskingGuardrail {
    base: CustomGuardrail,
    patterns: Vec<(String, Regex)>,
}

impl MaskingGuardrail {
    pub fn new(base: CustomGuardrail, patterns: Vec<(String, Regex)>) -> Self {
        Self { base, patterns }
    }

    /// Reads `patterns: {LABEL: regex}`; defaults to email and phone numbers.
    pub fn from_spec(spec: &GuardrailSpec) -> Result<Self, GuardrailError> {
        let base = CustomGuardrail::from_spec(spec);
        let patterns = match spec.litellm_params.extra.get("patterns") {
            None => vec![
                ("EMAIL".to_string(), EMAIL_REGEX.clone()),
                ("PHONE".to_string(), PHONE_REGEX.clone()),
            ],
            Some(Value::Object(patterns)) => patterns
                .iter()
                .map(|(label, pattern)| {
                    let pattern = pattern.as_str().ok_or_else(|| {
                        GuardrailError::InvalidConfig(format!("pattern {label} must be a string"))
                    })?;
                    let regex = Regex::new(pattern).map_err(|e| {
                        GuardrailError::InvalidConfig(format!("pattern {label}: {e}"))
                    })?;
                    Ok((label.clone(), regex))
                })
                .collect::<Result<Vec<_>, GuardrailError>>()?,
            Some(_) => {
                return Err(GuardrailError::InvalidConfig(
                    "patterns must be a mapping of label to regex".to_string(),
                ))
            }
        };

        Ok(Self::new(base, patterns))
    }

    pub fn mask_text(&self, text: &str) -> String {
        self.patterns
            .iter()
            .fold(text.to_string(), |text, (label, regex)| {
                let replacement = format!("[{label}]");
                regex.replace_all(&text, NoExpand(&replacement)).into_owned()
            })
    }

    fn mask_messages(&self, messages: Option<&mut Vec<Value>>) {
        for message in messages.into_iter().flatten() {
            if let Some(content) = message.get_mut("content") {
                if let Some(text) = content.as_str() {
                    *content = Value::String(self.mask_text(text));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Guardrail for MaskingGuardrail {
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
        self.mask_messages(data.get_mut("messages").and_then(Value::as_array_mut));
        Ok(())
    }

    async fn post_call(
        &self,
        _data: &Value,
        response: &mut ChatCompletionResponse,
    ) -> Result<(), GuardrailError> {
        for choice in response.choices.iter_mut() {
            if let Some(content) = choice.message.content.as_mut() {
                *content = self.mask_text(content);
            }
        }
        Ok(())
    }
}

impl CustomLogger for MaskingGuardrail {
    fn name(&self) -> &str {
        &self.base.guardrail_name
    }

    fn logging_hook(
        &self,
        mut kwargs: CallKwargs,
        result: Value,
        _call_type: CallType,
    ) -> Result<(CallKwargs, Value), CallbackError> {
        let active = self.base.default_on
            || self.base.should_run_guardrail(
                &Value::Object(kwargs.as_map().clone()),
                GuardrailEventHooks::LoggingOnly,
            );
        if !active {
            return Ok((kwargs, result));
        }

        self.mask_messages(kwargs.messages_mut());
        self.mask_messages(kwargs.input_mut());
        Ok((kwargs, result))
    }
}
