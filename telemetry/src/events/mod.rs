use bytemuck::TransparentWrapper;
use serde_json::Value;
use valuable::{Listable, Mappable, Valuable, Visit};

pub mod span;

pub const SPAN_COMPLETION: &str = "completion";

pub const SPAN_GUARDRAIL_EVALUATION: &str = "guardrail_evaluation";

pub const SPAN_LOGGING_HOOK: &str = "logging_hook";

pub const TARGET_COMPLETION: &str = "switchyard::user_tracing::completion";

pub const TARGET_GUARDRAIL: &str = "switchyard::user_tracing::guardrail";

pub const TARGET_CALLBACK: &str = "switchyard::user_tracing::callback";

/// Borrowed `serde_json::Value` that can be recorded as a structured span field.
#[repr(transparent)]
pub struct JsonValue<'a>(pub &'a Value);

#[derive(TransparentWrapper)]
#[repr(transparent)]
struct JsonMap(serde_json::Map<String, Value>);

#[derive(TransparentWrapper)]
#[repr(transparent)]
struct JsonArray(Vec<Value>);

fn number_value(num: &serde_json::Number) -> valuable::Value<'static> {
    if let Some(v) = num.as_i64() {
        valuable::Value::I64(v)
    } else if let Some(v) = num.as_u64() {
        valuable::Value::U64(v)
    } else {
        num.as_f64()
            .map(valuable::Value::F64)
            .unwrap_or(valuable::Value::Unit)
    }
}

fn json_as_value(value: &Value) -> valuable::Value<'_> {
    match value {
        Value::Array(array) => JsonArray::wrap_ref(array).as_value(),
        Value::Bool(value) => value.as_value(),
        Value::Number(num) => number_value(num),
        Value::Null => valuable::Value::Unit,
        Value::String(s) => s.as_value(),
        Value::Object(object) => JsonMap::wrap_ref(object).as_value(),
    }
}

fn json_visit(value: &Value, visit: &mut dyn Visit) {
    match value {
        Value::Array(array) => JsonArray::wrap_ref(array).visit(visit),
        Value::Bool(value) => value.visit(visit),
        Value::Number(num) => visit.visit_value(number_value(num)),
        Value::Null => valuable::Value::Unit.visit(visit),
        Value::String(s) => s.visit(visit),
        Value::Object(object) => JsonMap::wrap_ref(object).visit(visit),
    }
}

impl Valuable for JsonValue<'_> {
    fn as_value(&self) -> valuable::Value<'_> {
        json_as_value(self.0)
    }

    fn visit(&self, visit: &mut dyn Visit) {
        json_visit(self.0, visit)
    }
}

impl Valuable for JsonMap {
    fn as_value(&self) -> valuable::Value<'_> {
        valuable::Value::Mappable(self)
    }

    fn visit(&self, visit: &mut dyn Visit) {
        for (k, v) in self.0.iter() {
            visit.visit_entry(k.as_value(), JsonValue(v).as_value());
        }
    }
}

impl Mappable for JsonMap {
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.0.len();
        (len, Some(len))
    }
}

impl Valuable for JsonArray {
    fn as_value(&self) -> valuable::Value<'_> {
        valuable::Value::Listable(self)
    }

    fn visit(&self, visit: &mut dyn Visit) {
        for v in self.0.iter() {
            visit.visit_value(JsonValue(v).as_value())
        }
    }
}

impl Listable for JsonArray {
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.0.len();
        (len, Some(len))
    }
}
