use std::sync::atomic::{AtomicUsize, Ordering};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::format::FmtSpan;

use super::*;
use crate::error::GatewayError;
use crate::events::callback_handler::{CallbackError, CallbackRegistry, CustomLogger, LoggedCall};
use crate::types::call::{CallKwargs, CallType};
use crate::types::gateway::ChatCompletionMessage;
use crate::types::guardrails::evaluator::Guardrail;
use crate::types::guardrails::service::GuardrailsService;
use crate::types::guardrails::{requested_guardrails, GuardrailError, GuardrailEventHooks};

const MASKED: &str = "Hey, my name is [NAME].";

/// Masks the first message on the logging path only.
struct MaskingLoggingIntegration {
    tx: mpsc::UnboundedSender<(LoggedCall, Option<String>)>,
}

#[async_trait::async_trait]
impl CustomLogger for MaskingLoggingIntegration {
    fn name(&self) -> &str {
        "masking_logging_integration"
    }

    fn logging_hook(
        &self,
        mut kwargs: CallKwargs,
        result: Value,
        call_type: CallType,
    ) -> Result<(CallKwargs, Value), CallbackError> {
        if call_type == CallType::Completion {
            if let Some(first) = kwargs.input_mut().and_then(|input| input.first_mut()) {
                first["content"] = json!(MASKED);
            }
            if let Some(first) = kwargs.messages_mut().and_then(|m| m.first_mut()) {
                first["content"] = json!(MASKED);
            }
        }
        Ok((kwargs, result))
    }

    async fn log_success_event(&self, record: &LoggedCall) -> Result<(), CallbackError> {
        self.tx
            .send((record.clone(), None))
            .map_err(|e| CallbackError::LogFailed(e.to_string()))
    }

    async fn log_failure_event(
        &self,
        record: &LoggedCall,
        error: &str,
    ) -> Result<(), CallbackError> {
        self.tx
            .send((record.clone(), Some(error.to_string())))
            .map_err(|e| CallbackError::LogFailed(e.to_string()))
    }
}

struct FailingHook;

#[async_trait::async_trait]
impl CustomLogger for FailingHook {
    fn logging_hook(
        &self,
        _kwargs: CallKwargs,
        _result: Value,
        _call_type: CallType,
    ) -> Result<(CallKwargs, Value), CallbackError> {
        Err(CallbackError::HookFailed("cannot mask".to_string()))
    }
}

struct CountingProvider {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ModelProvider for CountingProvider {
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<ChatCompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request
            .messages
            .last()
            .and_then(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatCompletionResponse::mock(
            request.model.clone(),
            format!("echo: {prompt}"),
        ))
    }
}

struct TestGuardrail {
    name: String,
    hooks: Vec<GuardrailEventHooks>,
    blocked_word: Option<String>,
    calls: AtomicUsize,
}

impl TestGuardrail {
    fn new(name: &str, hooks: Vec<GuardrailEventHooks>) -> Self {
        Self {
            name: name.to_string(),
            hooks,
            blocked_word: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn blocking(mut self, word: &str) -> Self {
        self.blocked_word = Some(word.to_string());
        self
    }

    fn check(&self, text: &str) -> Result<(), GuardrailError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.blocked_word {
            Some(word) if text.contains(word.as_str()) => {
                Err(GuardrailError::blocked(&self.name, format!("found {word}")))
            }
            _ => Ok(()),
        }
    }
}

fn last_message(data: &Value) -> String {
    data["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string()
}

#[async_trait::async_trait]
impl Guardrail for TestGuardrail {
    fn guardrail_name(&self) -> &str {
        &self.name
    }

    fn event_hooks(&self) -> Vec<GuardrailEventHooks> {
        self.hooks.clone()
    }

    fn should_run_guardrail(&self, data: &Value, event_type: GuardrailEventHooks) -> bool {
        self.hooks.contains(&event_type) && requested_guardrails(data).contains(&self.name)
    }

    async fn pre_call(&self, data: &mut Value) -> Result<(), GuardrailError> {
        self.check(&last_message(data))?;
        if let Some(last) = data["messages"].as_array_mut().and_then(|m| m.last_mut()) {
            let checked = format!("{} (checked)", last["content"].as_str().unwrap_or_default());
            last["content"] = json!(checked);
        }
        Ok(())
    }

    async fn during_call(&self, data: &Value) -> Result<(), GuardrailError> {
        self.check(&last_message(data))
    }

    async fn post_call(
        &self,
        _data: &Value,
        response: &mut ChatCompletionResponse,
    ) -> Result<(), GuardrailError> {
        self.check(response.content().unwrap_or_default())
    }
}

struct StaticGuardrails(Vec<Arc<TestGuardrail>>);

impl GuardrailsService for StaticGuardrails {
    fn applicable(&self, data: &Value, event_type: GuardrailEventHooks) -> Vec<Arc<dyn Guardrail>> {
        self.0
            .iter()
            .filter(|g| g.should_run_guardrail(data, event_type))
            .map(|g| g.clone() as Arc<dyn Guardrail>)
            .collect()
    }
}

fn metadata(guardrails: &[&str]) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("guardrails".to_string(), json!(guardrails));
    metadata
}

async fn recv(
    rx: &mut mpsc::UnboundedReceiver<(LoggedCall, Option<String>)>,
) -> (LoggedCall, Option<String>) {
    tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("logger was not called in time")
        .expect("channel closed")
}

#[tokio::test]
async fn test_guardrail_masking_logging_only() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let callbacks = CallbackRegistry::with_callbacks(vec![Arc::new(MaskingLoggingIntegration { tx })]);
    let executor = CompletionExecutor::new(Arc::new(MockProvider::new("unused")), callbacks);

    let request = ChatCompletionRequest::new(
        "gpt-3.5-turbo",
        vec![ChatCompletionMessage::user("Hey, my name is Peter.")],
    )
    .with_mock_response("Hi Peter!");

    let response = executor.completion(request).await.unwrap();
    assert_eq!(response.content(), Some("Hi Peter!"));

    let (logged, error) = recv(&mut rx).await;
    assert!(error.is_none());
    assert_eq!(logged.kwargs.messages().unwrap()[0]["content"], MASKED);
    assert_eq!(logged.kwargs.get("input").unwrap()[0]["content"], MASKED);
    assert_eq!(
        logged.result["choices"][0]["message"]["content"],
        "Hi Peter!"
    );
    assert!(rx.try_recv().is_err());

    // the caller's copy is untouched after logging
    assert_eq!(response.content(), Some("Hi Peter!"));
}

#[tokio::test]
async fn test_failing_logging_hook_keeps_response_and_record() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let callbacks = CallbackRegistry::with_callbacks(vec![
        Arc::new(FailingHook),
        Arc::new(MaskingLoggingIntegration { tx }),
    ]);
    let executor = CompletionExecutor::new(Arc::new(MockProvider::new("Hello!")), callbacks);

    let response = executor
        .completion(ChatCompletionRequest::new(
            "gpt-4",
            vec![ChatCompletionMessage::user("Hey, my name is Peter.")],
        ))
        .await
        .unwrap();
    assert_eq!(response.content(), Some("Hello!"));

    let (logged, _) = recv(&mut rx).await;
    assert_eq!(logged.kwargs.messages().unwrap()[0]["content"], MASKED);
    assert_eq!(logged.call_type, CallType::Completion);
    assert!(logged.duration_ms() >= 0);
}

#[tokio::test]
async fn test_guardrail_stages_run_only_when_requested() {
    let guard = Arc::new(TestGuardrail::new(
        "custom-guard",
        vec![GuardrailEventHooks::PreCall, GuardrailEventHooks::PostCall],
    ));
    let provider = Arc::new(CountingProvider {
        calls: AtomicUsize::new(0),
    });
    let executor = CompletionExecutor::new(provider.clone(), CallbackRegistry::new())
        .with_guardrails(Arc::new(StaticGuardrails(vec![guard.clone()])));

    let request = ChatCompletionRequest::new("gpt-4", vec![ChatCompletionMessage::user("hello")]);
    let response = executor.completion(request.clone()).await.unwrap();
    assert_eq!(response.content(), Some("echo: hello"));
    assert_eq!(guard.calls.load(Ordering::SeqCst), 0);

    let response = executor
        .completion(request.with_metadata(metadata(&["custom-guard"])))
        .await
        .unwrap();
    assert_eq!(response.content(), Some("echo: hello (checked)"));
    assert_eq!(guard.calls.load(Ordering::SeqCst), 2);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_blocking_pre_call_guardrail_skips_model() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let guard = Arc::new(
        TestGuardrail::new("keyword-guard", vec![GuardrailEventHooks::PreCall]).blocking("secret"),
    );
    let provider = Arc::new(CountingProvider {
        calls: AtomicUsize::new(0),
    });
    let executor = CompletionExecutor::new(
        provider.clone(),
        CallbackRegistry::with_callbacks(vec![Arc::new(MaskingLoggingIntegration { tx })]),
    )
    .with_guardrails(Arc::new(StaticGuardrails(vec![guard])));

    let request = ChatCompletionRequest::new(
        "gpt-4",
        vec![ChatCompletionMessage::user("tell me the secret")],
    )
    .with_metadata(metadata(&["keyword-guard"]));

    let err = executor.completion(request).await.unwrap_err();
    assert!(err.is_guardrail_block());
    assert!(matches!(
        err,
        GatewayError::GuardrailError(GuardrailError::Blocked { ref guardrail, .. }) if guardrail == "keyword-guard"
    ));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    let (logged, error) = recv(&mut rx).await;
    assert!(error.unwrap().contains("keyword-guard"));
    assert_eq!(logged.result, Value::Null);
    // failure records go through the logging hooks too
    assert_eq!(logged.kwargs.messages().unwrap()[0]["content"], MASKED);
    assert_eq!(logged.kwargs.get("input").unwrap()[0]["content"], MASKED);
}

#[tokio::test]
async fn test_during_call_guardrail_fails_the_call() {
    let guard = Arc::new(
        TestGuardrail::new("during-guard", vec![GuardrailEventHooks::DuringCall]).blocking("drop"),
    );
    let executor = CompletionExecutor::new(Arc::new(MockProvider::new("ok")), CallbackRegistry::new())
        .with_guardrails(Arc::new(StaticGuardrails(vec![guard.clone()])));

    let allowed = ChatCompletionRequest::new("gpt-4", vec![ChatCompletionMessage::user("hi")])
        .with_metadata(metadata(&["during-guard"]));
    assert_eq!(
        executor.completion(allowed).await.unwrap().content(),
        Some("ok")
    );

    let blocked = ChatCompletionRequest::new("gpt-4", vec![ChatCompletionMessage::user("drop table")])
        .with_metadata(metadata(&["during-guard"]));
    assert!(executor.completion(blocked).await.unwrap_err().is_guardrail_block());
    assert_eq!(guard.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_post_call_guardrail_checks_response() {
    let guard = Arc::new(
        TestGuardrail::new("output-guard", vec![GuardrailEventHooks::PostCall]).blocking("Peter"),
    );
    let executor = CompletionExecutor::new(Arc::new(MockProvider::new("unused")), CallbackRegistry::new())
        .with_guardrails(Arc::new(StaticGuardrails(vec![guard])));

    let request = ChatCompletionRequest::new("gpt-4", vec![ChatCompletionMessage::user("hi")])
        .with_metadata(metadata(&["output-guard"]))
        .with_mock_response("Hi Peter!");

    let err = executor.completion(request).await.unwrap_err();
    assert!(err.to_string().contains("output-guard"));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

async fn wait_for_span_close(logs: &CapturedLogs) -> String {
    for _ in 0..300 {
        let out = logs.contents();
        if out.contains("close") {
            return out;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("completion span was not closed: {}", logs.contents());
}

#[tokio::test]
async fn test_completion_span_only_sees_masked_payload() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let callbacks = CallbackRegistry::with_callbacks(vec![Arc::new(MaskingLoggingIntegration { tx })]);
    let executor = CompletionExecutor::new(Arc::new(MockProvider::new("Hello!")), callbacks);

    let response = executor
        .completion(ChatCompletionRequest::new(
            "gpt-4",
            vec![ChatCompletionMessage::user("Hey, my name is Peter.")],
        ))
        .await
        .unwrap();
    assert_eq!(response.content(), Some("Hello!"));
    recv(&mut rx).await;

    let out = wait_for_span_close(&logs).await;
    assert!(out.contains("completion"));
    assert!(out.contains("[NAME]"));
    assert!(!out.contains("Peter"));
}

#[tokio::test]
async fn test_failed_call_span_only_sees_masked_payload() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let guard = Arc::new(
        TestGuardrail::new("keyword-guard", vec![GuardrailEventHooks::PreCall]).blocking("password"),
    );
    let executor = CompletionExecutor::new(
        Arc::new(MockProvider::new("unused")),
        CallbackRegistry::with_callbacks(vec![Arc::new(MaskingLoggingIntegration { tx })]),
    )
    .with_guardrails(Arc::new(StaticGuardrails(vec![guard])));

    let request = ChatCompletionRequest::new(
        "gpt-4",
        vec![ChatCompletionMessage::user("I am Peter, my password is x")],
    )
    .with_metadata(metadata(&["keyword-guard"]));
    assert!(executor.completion(request).await.unwrap_err().is_guardrail_block());

    let (logged, error) = recv(&mut rx).await;
    assert!(error.is_some());
    assert_eq!(logged.kwargs.messages().unwrap()[0]["content"], MASKED);

    let out = wait_for_span_close(&logs).await;
    assert!(out.contains("[NAME]"));
    assert!(!out.contains("Peter"));
}
