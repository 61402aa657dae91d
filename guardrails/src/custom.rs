use serde_json::Value;
use switchyard_core::types::guardrails::evaluator::Guardrail;
use switchyard_core::types::guardrails::{
    requested_guardrails, GuardrailEventHooks, GuardrailMode, GuardrailSpec,
};

/// Guardrail with no checks of its own: a name plus the hooks it runs on.
///
/// Other guardrails embed it to answer "should I run for this call?".
#[derive(Debug, Clone, PartialEq)]
pub struct CustomGuardrail {
    pub guardrail_name: String,
    pub event_hook: GuardrailMode,
    pub default_on: bool,
}

impl CustomGuardrail {
    pub fn new(guardrail_name: impl Into<String>, event_hook: impl Into<GuardrailMode>) -> Self {
        Self {
            guardrail_name: guardrail_name.into(),
            event_hook: event_hook.into(),
            default_on: false,
        }
    }

    pub fn from_spec(spec: &GuardrailSpec) -> Self {
        Self {
            guardrail_name: spec.guardrail_name.clone(),
            event_hook: spec.litellm_params.mode.clone(),
            default_on: spec.litellm_params.default_on,
        }
    }

    pub fn with_default_on(mut self, default_on: bool) -> Self {
        self.default_on = default_on;
        self
    }

    /// True iff `event_type` is one of this guardrail's hooks and the call
    /// lists this guardrail in its metadata.
    pub fn should_run_guardrail(&self, data: &Value, event_type: GuardrailEventHooks) -> bool {
        if !self.event_hook.contains(event_type) {
            return false;
        }

        let requested = requested_guardrails(data);
        let run = requested.iter().any(|name| name == &self.guardrail_name);
        tracing::debug!(
            guardrail = self.guardrail_name,
            event = event_type.as_str(),
            ?requested,
            run,
            "Guardrail applicability"
        );
        run
    }
}

#[async_trait::async_trait]
impl Guardrail for CustomGuardrail {
    fn guardrail_name(&self) -> &str {
        &self.guardrail_name
    }

    fn event_hooks(&self) -> Vec<GuardrailEventHooks> {
        self.event_hook.hooks()
    }

    fn default_on(&self) -> bool {
        self.default_on
    }

    fn should_run_guardrail(&self, data: &Value, event_type: GuardrailEventHooks) -> bool {
        CustomGuardrail::should_run_guardrail(self, data, event_type)
    }
}
