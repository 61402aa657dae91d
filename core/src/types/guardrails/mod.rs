use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod evaluator;
pub mod service;


/// Lifecycle points at which a guardrail may run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailEventHooks {
    /// Before the request is sent to the model
    PreCall,
    /// After the model answered, before the response is returned
    PostCall,
    /// In parallel with the model call
    DuringCall,
    /// Only on the logging path; never sees the live request
    LoggingOnly,
    PreMcpCall,
    DuringMcpCall,
}

impl GuardrailEventHooks {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardrailEventHooks::PreCall => "pre_call",
            GuardrailEventHooks::PostCall => "post_call",
            GuardrailEventHooks::DuringCall => "during_call",
            GuardrailEventHooks::LoggingOnly => "logging_only",
            GuardrailEventHooks::PreMcpCall => "pre_mcp_call",
            GuardrailEventHooks::DuringMcpCall => "during_mcp_call",
        }
    }
}

impl fmt::Display for GuardrailEventHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuardrailEventHooks {
    type Err = GuardrailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre_call" => Ok(GuardrailEventHooks::PreCall),
            "post_call" => Ok(GuardrailEventHooks::PostCall),
            "during_call" => Ok(GuardrailEventHooks::DuringCall),
            "logging_only" => Ok(GuardrailEventHooks::LoggingOnly),
            "pre_mcp_call" => Ok(GuardrailEventHooks::PreMcpCall),
            "during_mcp_call" => Ok(GuardrailEventHooks::DuringMcpCall),
            other => Err(GuardrailError::UnknownEventHook(other.to_string())),
        }
    }
}

/// The hook(s) a guardrail is registered for: a single hook or a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum GuardrailMode {
    Single(GuardrailEventHooks),
    Multiple(Vec<GuardrailEventHooks>),
}

impl GuardrailMode {
    pub fn hooks(&self) -> Vec<GuardrailEventHooks> {
        match self {
            GuardrailMode::Single(hook) => vec![*hook],
            GuardrailMode::Multiple(hooks) => hooks.clone(),
        }
    }

    pub fn contains(&self, event_type: GuardrailEventHooks) -> bool {
        match self {
            GuardrailMode::Single(hook) => *hook == event_type,
            GuardrailMode::Multiple(hooks) => hooks.contains(&event_type),
        }
    }
}

impl From<GuardrailEventHooks> for GuardrailMode {
    fn from(hook: GuardrailEventHooks) -> Self {
        GuardrailMode::Single(hook)
    }
}

impl From<Vec<GuardrailEventHooks>> for GuardrailMode {
    fn from(hooks: Vec<GuardrailEventHooks>) -> Self {
        GuardrailMode::Multiple(hooks)
    }
}

/// Structured settings of a configured guardrail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LitellmParams {
    /// Guardrail type, e.g. `regex_mask` or `keyword_block`
    pub guardrail: String,
    pub mode: GuardrailMode,
    /// Run the guardrail even when the request does not ask for it
    #[serde(default)]
    pub default_on: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_request_content: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_response_content: Option<bool>,
    /// Guardrail specific settings, kept as given
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LitellmParams {
    pub fn new(guardrail: impl Into<String>, mode: impl Into<GuardrailMode>) -> Self {
        Self {
            guardrail: guardrail.into(),
            mode: mode.into(),
            default_on: false,
            api_key: None,
            api_base: None,
            mask_request_content: None,
            mask_response_content: None,
            extra: Map::new(),
        }
    }

    pub fn with_default_on(mut self, default_on: bool) -> Self {
        self.default_on = default_on;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// One guardrail entry of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuardrailSpec {
    pub guardrail_name: String,
    pub litellm_params: LitellmParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardrail_info: Option<Map<String, Value>>,
}

impl GuardrailSpec {
    pub fn new(guardrail_name: impl Into<String>, litellm_params: LitellmParams) -> Self {
        Self {
            guardrail_name: guardrail_name.into(),
            litellm_params,
            guardrail_info: None,
        }
    }
}

/// Public description of a configured guardrail.
///
/// `guardrail_info` is an opaque blob; its contents never feed back into
/// `litellm_params`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuardrailInfoResponse {
    pub guardrail_name: String,
    pub litellm_params: LitellmParams,
    #[serde(default)]
    pub guardrail_info: Option<Map<String, Value>>,
}

impl GuardrailInfoResponse {
    pub fn new(
        guardrail_name: impl Into<String>,
        litellm_params: LitellmParams,
        guardrail_info: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            guardrail_name: guardrail_name.into(),
            litellm_params,
            guardrail_info,
        }
    }
}

impl From<&GuardrailSpec> for GuardrailInfoResponse {
    fn from(spec: &GuardrailSpec) -> Self {
        let mut litellm_params = spec.litellm_params.clone();
        litellm_params.api_key = None;
        Self {
            guardrail_name: spec.guardrail_name.clone(),
            litellm_params,
            guardrail_info: spec.guardrail_info.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GuardrailError {
    #[error("Guardrail {guardrail} blocked the request: {reason}")]
    Blocked { guardrail: String, reason: String },

    #[error("Unknown guardrail event hook: {0}")]
    UnknownEventHook(String),

    #[error("Unsupported guardrail type: {0}")]
    UnsupportedGuardrail(String),

    #[error("Invalid guardrail config: {0}")]
    InvalidConfig(String),

    #[error("Guardrail produced an invalid request")]
    InvalidRequest(#[from] serde_json::Error),
}

impl GuardrailError {
    pub fn blocked(guardrail: impl Into<String>, reason: impl Into<String>) -> Self {
        GuardrailError::Blocked {
            guardrail: guardrail.into(),
            reason: reason.into(),
        }
    }
}

/// Names of the guardrails a call asked for.
///
/// Reads `metadata.guardrails`, falling back to `litellm_metadata.guardrails`.
/// Entries are names, or single key objects whose key is the name. Anything
/// malformed means no guardrails are requested.
pub fn requested_guardrails(data: &Value) -> Vec<String> {
    let list = ["metadata", "litellm_metadata"]
        .iter()
        .filter_map(|key| data.get(key))
        .filter_map(|metadata| metadata.get("guardrails"))
        .find_map(Value::as_array);

    let Some(list) = list else {
        return vec![];
    };

    list.iter()
        .filter_map(|entry| match entry {
            Value::String(name) => Some(name.clone()),
            Value::Object(map) if map.len() == 1 => map.keys().next().cloned(),
            _ => None,
        })
        .collect()
}
