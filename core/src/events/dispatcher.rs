use tokio::task::JoinHandle;
use tracing::Span;
use tracing_futures::Instrument;

use crate::events::callback_handler::{CallbackRegistry, LoggedCall};

/// Hands finished calls to the registered loggers.
///
/// Dispatch runs on its own task: by the time loggers see a record the
/// caller already holds its response, and nothing a logger does can
/// replace it.
#[derive(Clone, Debug, Default)]
pub struct LoggingDispatcher {
    callbacks: CallbackRegistry,
}

impl LoggingDispatcher {
    pub fn new(callbacks: CallbackRegistry) -> Self {
        Self { callbacks }
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub fn dispatch_success(&self, record: LoggedCall) -> JoinHandle<()> {
        let callbacks = self.callbacks.clone();
        tokio::spawn(log_success(callbacks, record).instrument(Span::current()))
    }

    pub fn dispatch_failure(&self, record: LoggedCall, error: String) -> JoinHandle<()> {
        let callbacks = self.callbacks.clone();
        tokio::spawn(log_failure(callbacks, record, error).instrument(Span::current()))
    }
}

/// Runs every logging hook in registration order, each on the previous
/// hook's output. A failing hook leaves the record as it found it.
pub fn apply_logging_hooks(callbacks: &CallbackRegistry, mut record: LoggedCall) -> LoggedCall {
    for callback in callbacks.iter() {
        let span = switchyard_telemetry::create_logging_hook_span!(
            callback.name(),
            record.call_type.as_str()
        );
        let _enter = span.enter();

        match callback.logging_hook(record.kwargs.clone(), record.result.clone(), record.call_type)
        {
            Ok((kwargs, result)) => {
                record.kwargs = kwargs;
                record.result = result;
            }
            Err(e) => {
                span.record("error", e.to_string());
                tracing::warn!(
                    callback = callback.name(),
                    call_id = record.call_id,
                    "Logging hook failed, keeping the record unchanged: {e}"
                );
            }
        }
    }

    record
}

/// Records the transformed call on the span the dispatch runs in. Raw
/// payloads never reach telemetry.
fn record_on_span(record: &LoggedCall) {
    let span = Span::current();
    let request = record.kwargs.clone().into_value();
    switchyard_telemetry::record_json!(span, "request", &request);
    if !record.result.is_null() {
        switchyard_telemetry::record_json!(span, "response", &record.result);
    }
}

pub async fn log_success(callbacks: CallbackRegistry, record: LoggedCall) {
    let record = apply_logging_hooks(&callbacks, record);
    record_on_span(&record);

    for callback in callbacks.iter() {
        if let Err(e) = callback.log_success_event(&record).await {
            tracing::error!(
                callback = callback.name(),
                call_id = record.call_id,
                "Failed to log success event: {e}"
            );
        }
    }
}

pub async fn log_failure(callbacks: CallbackRegistry, record: LoggedCall, error: String) {
    let record = apply_logging_hooks(&callbacks, record);
    record_on_span(&record);

    for callback in callbacks.iter() {
        if let Err(e) = callback.log_failure_event(&record, &error).await {
            tracing::error!(
                callback = callback.name(),
                call_id = record.call_id,
                "Failed to log failure event: {e}"
            );
        }
    }
}
