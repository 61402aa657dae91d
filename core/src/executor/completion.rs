use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde_json::Value;
use tracing::Span;
use tracing_futures::Instrument;
use uuid::Uuid;

use crate::events::callback_handler::{CallbackRegistry, LoggedCall};
use crate::events::dispatcher::LoggingDispatcher;
use crate::executor::ModelProvider;
use crate::types::call::{CallKwargs, CallType};
use crate::types::gateway::{ChatCompletionRequest, ChatCompletionResponse};
use crate::types::guardrails::evaluator::Guardrail;
use crate::types::guardrails::service::GuardrailsService;
use crate::types::guardrails::{GuardrailError, GuardrailEventHooks};
use crate::GatewayResult;

/// Runs a chat completion through guardrails, the model and the loggers.
pub struct CompletionExecutor {
    provider: Arc<dyn ModelProvider>,
    dispatcher: LoggingDispatcher,
    guardrails: Option<Arc<dyn GuardrailsService>>,
}

impl CompletionExecutor {
    pub fn new(provider: Arc<dyn ModelProvider>, callbacks: CallbackRegistry) -> Self {
        Self {
            provider,
            dispatcher: LoggingDispatcher::new(callbacks),
            guardrails: None,
        }
    }

    /// Adds a guardrail source; its logging-only guardrails are appended to
    /// the loggers.
    pub fn with_guardrails(mut self, guardrails: Arc<dyn GuardrailsService>) -> Self {
        let mut callbacks = self.dispatcher.callbacks().clone();
        callbacks.extend(guardrails.logging_callbacks());
        self.dispatcher = LoggingDispatcher::new(callbacks);
        self.guardrails = Some(guardrails);
        self
    }

    pub async fn completion(
        &self,
        request: ChatCompletionRequest,
    ) -> GatewayResult<ChatCompletionResponse> {
        let call_id = Uuid::new_v4().to_string();
        let span = switchyard_telemetry::create_completion_span!(
            request.model.as_str(),
            call_id.as_str()
        );
        let start_time = Utc::now();
        let original_kwargs = CallKwargs::from_request(&request)?;

        match self.execute(request).instrument(span.clone()).await {
            Ok((request, response)) => {
                match Self::logged_call(call_id, &request, &response, start_time) {
                    Ok(record) => {
                        let _guard = span.enter();
                        self.dispatcher.dispatch_success(record);
                    }
                    Err(e) => {
                        tracing::warn!("Skipping success logging, call record is not serializable: {e}")
                    }
                }
                Ok(response)
            }
            Err(e) => {
                span.record("error", e.to_string());
                let record = LoggedCall {
                    call_id,
                    call_type: CallType::Completion,
                    kwargs: original_kwargs,
                    result: Value::Null,
                    start_time,
                    end_time: Utc::now(),
                };
                let _guard = span.enter();
                self.dispatcher.dispatch_failure(record, e.to_string());
                Err(e)
            }
        }
    }

    fn logged_call(
        call_id: String,
        request: &ChatCompletionRequest,
        response: &ChatCompletionResponse,
        start_time: DateTime<Utc>,
    ) -> Result<LoggedCall, serde_json::Error> {
        Ok(LoggedCall {
            call_id,
            call_type: CallType::Completion,
            kwargs: CallKwargs::from_request(request)?,
            result: serde_json::to_value(response)?,
            start_time,
            end_time: Utc::now(),
        })
    }

    async fn execute(
        &self,
        request: ChatCompletionRequest,
    ) -> GatewayResult<(ChatCompletionRequest, ChatCompletionResponse)> {
        let request = self.run_pre_call(request).await?;
        let data = serde_json::to_value(&request)?;

        let during_call = self.applicable(&data, GuardrailEventHooks::DuringCall);
        let (response, during_call_result) = tokio::join!(
            self.invoke_model(&request),
            try_join_all(during_call.iter().map(|g| g.during_call(&data)))
        );
        during_call_result?;
        let mut response = response?;

        for guardrail in self.applicable(&data, GuardrailEventHooks::PostCall) {
            guardrail.post_call(&data, &mut response).await?;
        }

        Ok((request, response))
    }

    async fn run_pre_call(
        &self,
        request: ChatCompletionRequest,
    ) -> GatewayResult<ChatCompletionRequest> {
        let mut data = serde_json::to_value(&request)?;
        let guardrails = self.applicable(&data, GuardrailEventHooks::PreCall);
        if guardrails.is_empty() {
            return Ok(request);
        }

        for guardrail in guardrails {
            guardrail.pre_call(&mut data).await?;
        }

        Ok(serde_json::from_value(data).map_err(GuardrailError::InvalidRequest)?)
    }

    async fn invoke_model(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<ChatCompletionResponse> {
        if let Some(mock_response) = &request.mock_response {
            tracing::debug!("Answering with mock response");
            return Ok(ChatCompletionResponse::mock(
                request.model.clone(),
                mock_response.clone(),
            ));
        }

        self.provider
            .chat_completion(request)
            .instrument(Span::current())
            .await
    }

    fn applicable(&self, data: &Value, event_type: GuardrailEventHooks) -> Vec<Arc<dyn Guardrail>> {
        let guardrails = match &self.guardrails {
            Some(service) => service.applicable(data, event_type),
            None => vec![],
        };
        if !guardrails.is_empty() {
            tracing::debug!(
                event = event_type.as_str(),
                guardrails = ?guardrails.iter().map(|g| g.guardrail_name()).collect::<Vec<_>>(),
                "Running guardrails"
            );
        }
        guardrails
    }
}
