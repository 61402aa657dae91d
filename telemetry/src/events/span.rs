#[macro_export]
macro_rules! create_completion_span {
    ($model:expr, $call_id:expr) => {{
        tracing::info_span!(
            target: $crate::events::TARGET_COMPLETION,
            $crate::events::SPAN_COMPLETION,
            model = $model,
            call_id = $call_id,
            request = tracing::field::Empty,
            response = tracing::field::Empty,
            error = tracing::field::Empty,
        )
    }};
}

#[macro_export]
macro_rules! create_guardrail_span {
    ($guardrail:expr, $event:expr) => {{
        tracing::info_span!(
            target: $crate::events::TARGET_GUARDRAIL,
            $crate::events::SPAN_GUARDRAIL_EVALUATION,
            guardrail = $guardrail,
            event = $event,
            result = tracing::field::Empty,
        )
    }};
}

#[macro_export]
macro_rules! create_logging_hook_span {
    ($callback:expr, $call_type:expr) => {{
        tracing::debug_span!(
            target: $crate::events::TARGET_CALLBACK,
            $crate::events::SPAN_LOGGING_HOOK,
            callback = $callback,
            call_type = $call_type,
            error = tracing::field::Empty,
        )
    }};
}

/// Records a JSON payload on a span field as a structured value.
#[macro_export]
macro_rules! record_json {
    ($span:expr, $field:expr, $value:expr) => {{
        let value: &serde_json::Value = $value;
        #[cfg(tracing_unstable)]
        $span.record(
            $field,
            $crate::valuable::Valuable::as_value(&$crate::events::JsonValue(value)),
        );
        #[cfg(not(tracing_unstable))]
        $span.record($field, tracing::field::display(value));
    }};
}
