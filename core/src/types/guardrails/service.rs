use std::sync::Arc;

use serde_json::Value;

use crate::events::callback_handler::CustomLogger;
use crate::types::guardrails::evaluator::Guardrail;
use crate::types::guardrails::GuardrailEventHooks;

/// Source of the guardrails a call has to pass through
pub trait GuardrailsService: Send + Sync {
    /// Guardrails to run for `data` at `event_type`, in execution order
    fn applicable(&self, data: &Value, event_type: GuardrailEventHooks) -> Vec<Arc<dyn Guardrail>>;

    /// Guardrails that only act on the logging path
    fn logging_callbacks(&self) -> Vec<Arc<dyn CustomLogger>> {
        vec![]
    }
}
