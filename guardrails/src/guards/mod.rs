use std::sync::Arc;

use switchyard_core::events::callback_handler::CustomLogger;
use switchyard_core::types::guardrails::evaluator::Guardrail;
use switchyard_core::types::guardrails::{GuardrailError, GuardrailSpec};

use crate::custom::CustomGuardrail;

pub mod config;
pub mod keyword;
pub mod masking;
pub mod schema;
pub mod traced;


pub use keyword::KeywordGuardrail;
pub use masking::MaskingGuardrail;
pub use schema::SchemaGuardrail;
pub use traced::TracedGuardrail;

pub const GUARDRAIL_CUSTOM: &str = "custom";
pub const GUARDRAIL_REGEX_MASK: &str = "regex_mask";
pub const GUARDRAIL_KEYWORD_BLOCK: &str = "keyword_block";
pub const GUARDRAIL_JSON_SCHEMA: &str = "json_schema";

/// A guardrail built from config, plus its logger side if it has one
pub struct BuiltGuardrail {
    pub guardrail: Arc<dyn Guardrail>,
    pub logger: Option<Arc<dyn CustomLogger>>,
}

/// Builds the built-in guardrail named by `litellm_params.guardrail`
pub fn build_guardrail(spec: &GuardrailSpec) -> Result<BuiltGuardrail, GuardrailError> {
    let built = match spec.litellm_params.guardrail.as_str() {
        GUARDRAIL_CUSTOM => BuiltGuardrail {
            guardrail: Arc::new(CustomGuardrail::from_spec(spec)),
            logger: None,
        },
        GUARDRAIL_REGEX_MASK => {
            let guardrail = Arc::new(MaskingGuardrail::from_spec(spec)?);
            BuiltGuardrail {
                guardrail: guardrail.clone(),
                logger: Some(guardrail),
            }
        }
        GUARDRAIL_KEYWORD_BLOCK => BuiltGuardrail {
            guardrail: Arc::new(KeywordGuardrail::from_spec(spec)?),
            logger: None,
        },
        GUARDRAIL_JSON_SCHEMA => BuiltGuardrail {
            guardrail: Arc::new(SchemaGuardrail::from_spec(spec)?),
            logger: None,
        },
        other => return Err(GuardrailError::UnsupportedGuardrail(other.to_string())),
    };

    Ok(built)
}
