use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::gateway::ChatCompletionRequest;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Completion,
    Acompletion,
    Embedding,
    Aembedding,
    TextCompletion,
    ImageGeneration,
    Moderation,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Completion => "completion",
            CallType::Acompletion => "acompletion",
            CallType::Embedding => "embedding",
            CallType::Aembedding => "aembedding",
            CallType::TextCompletion => "text_completion",
            CallType::ImageGeneration => "image_generation",
            CallType::Moderation => "moderation",
        }
    }

    pub fn is_completion(&self) -> bool {
        matches!(self, CallType::Completion | CallType::Acompletion)
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a single call as seen by the logging pipeline.
///
/// Callbacks receive their own copy and may rewrite any key; the response
/// handed back to the caller is never rebuilt from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct CallKwargs(Map<String, Value>);

impl CallKwargs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_request(request: &ChatCompletionRequest) -> Result<Self, serde_json::Error> {
        let messages = serde_json::to_value(&request.messages)?;

        let mut kwargs = Map::new();
        kwargs.insert("model".to_string(), Value::String(request.model.clone()));
        kwargs.insert("input".to_string(), messages.clone());
        kwargs.insert("messages".to_string(), messages);
        kwargs.insert(
            "metadata".to_string(),
            Value::Object(request.metadata.clone().unwrap_or_default()),
        );
        if let Some(temperature) = request.temperature {
            kwargs.insert("temperature".to_string(), serde_json::to_value(temperature)?);
        }
        if let Some(max_tokens) = request.max_tokens {
            kwargs.insert("max_tokens".to_string(), Value::from(max_tokens));
        }
        if let Some(user) = &request.user {
            kwargs.insert("user".to_string(), Value::String(user.clone()));
        }

        Ok(Self(kwargs))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn model(&self) -> Option<&str> {
        self.get("model").and_then(Value::as_str)
    }

    pub fn messages(&self) -> Option<&Vec<Value>> {
        self.get("messages").and_then(Value::as_array)
    }

    pub fn messages_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.get_mut("messages").and_then(Value::as_array_mut)
    }

    pub fn input_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.get_mut("input").and_then(Value::as_array_mut)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for CallKwargs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
