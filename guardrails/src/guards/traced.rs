use std::sync::Arc;

use serde_json::{json, Value};
use switchyard_core::types::gateway::ChatCompletionResponse;
use switchyard_core::types::guardrails::evaluator::Guardrail;
use switchyard_core::types::guardrails::{GuardrailError, GuardrailEventHooks};
use tracing::Span;
use tracing_futures::Instrument;

/// Runs every hook of the wrapped guardrail inside a `guardrail_evaluation` span.
pub struct TracedGuardrail {
    inner: Arc<dyn Guardrail>,
}

impl TracedGuardrail {
    pub fn new(inner: Arc<dyn Guardrail>) -> Self {
        Self { inner }
    }

    fn span(&self, event_type: GuardrailEventHooks) -> Span {
        switchyard_telemetry::create_guardrail_span!(
            self.inner.guardrail_name(),
            event_type.as_str()
        )
    }

    fn record(span: &Span, result: &Result<(), GuardrailError>) {
        let value = match result {
            Ok(()) => json!({ "passed": true }),
            Err(e) => json!({ "passed": false, "error": e.to_string() }),
        };
        switchyard_telemetry::record_json!(span, "result", &value);
    }
}

#[async_trait::async_trait]
impl Guardrail for TracedGuardrail {
    fn guardrail_name(&self) -> &str {
        self.inner.guardrail_name()
    }

    fn event_hooks(&self) -> Vec<GuardrailEventHooks> {
        self.inner.event_hooks()
    }

    fn default_on(&self) -> bool {
        self.inner.default_on()
    }

    fn should_run_guardrail(&self, data: &Value, event_type: GuardrailEventHooks) -> bool {
        self.inner.should_run_guardrail(data, event_type)
    }

    async fn pre_call(&self, data: &mut Value) -> Result<(), GuardrailError> {
        let span = self.span(GuardrailEventHooks::PreCall);
        let result = self.inner.pre_call(data).instrument(span.clone()).await;
        Self::record(&span, &result);
        result
    }

    async fn during_call(&self, data: &Value) -> Result<(), GuardrailError> {
        let span = self.span(GuardrailEventHooks::DuringCall);
        let result = self.inner.during_call(data).instrument(span.clone()).await;
        Self::record(&span, &result);
        result
    }

    async fn post_call(
        &self,
        data: &Value,
        response: &mut ChatCompletionResponse,
    ) -> Result<(), GuardrailError> {
        let span = self.span(GuardrailEventHooks::PostCall);
        let result = self
            .inner
            .post_call(data, response)
            .instrument(span.clone())
            .await;
        Self::record(&span, &result);
        result
    }
}
