use std::sync::Arc;

use serde_json::Value;
use switchyard_core::events::callback_handler::CustomLogger;
use switchyard_core::types::guardrails::evaluator::Guardrail;
use switchyard_core::types::guardrails::service::GuardrailsService;
use switchyard_core::types::guardrails::{
    GuardrailError, GuardrailEventHooks, GuardrailInfoResponse, GuardrailSpec,
};

use crate::guards::config::GuardrailsConfig;
use crate::guards::{build_guardrail, TracedGuardrail};

struct RegisteredGuardrail {
    spec: GuardrailSpec,
    guardrail: Arc<dyn Guardrail>,
    logger: Option<Arc<dyn CustomLogger>>,
}

/// Configured guardrails, in registration order.
#[derive(Default)]
pub struct GuardrailRegistry {
    guardrails: Vec<RegisteredGuardrail>,
}

impl GuardrailRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every configured guardrail with the built-in factory
    pub fn from_config(config: &GuardrailsConfig) -> Result<Self, GuardrailError> {
        let mut registry = Self::new();
        for spec in &config.guardrails {
            let built = build_guardrail(spec)?;
            match built.logger {
                Some(logger) => {
                    registry.register_with_logger(spec.clone(), built.guardrail, logger)?
                }
                None => registry.register(spec.clone(), built.guardrail)?,
            }
        }
        Ok(registry)
    }

    pub fn register(
        &mut self,
        spec: GuardrailSpec,
        guardrail: Arc<dyn Guardrail>,
    ) -> Result<(), GuardrailError> {
        self.insert(spec, guardrail, None)
    }

    /// Registers a guardrail that also acts on the logging path
    pub fn register_with_logger(
        &mut self,
        spec: GuardrailSpec,
        guardrail: Arc<dyn Guardrail>,
        logger: Arc<dyn CustomLogger>,
    ) -> Result<(), GuardrailError> {
        self.insert(spec, guardrail, Some(logger))
    }

    fn insert(
        &mut self,
        spec: GuardrailSpec,
        guardrail: Arc<dyn Guardrail>,
        logger: Option<Arc<dyn CustomLogger>>,
    ) -> Result<(), GuardrailError> {
        if self.get(&spec.guardrail_name).is_some() {
            return Err(GuardrailError::InvalidConfig(format!(
                "duplicate guardrail name {}",
                spec.guardrail_name
            )));
        }

        tracing::debug!(
            guardrail = spec.guardrail_name,
            kind = spec.litellm_params.guardrail,
            default_on = spec.litellm_params.default_on,
            "Registered guardrail"
        );
        self.guardrails.push(RegisteredGuardrail {
            spec,
            guardrail: Arc::new(TracedGuardrail::new(guardrail)),
            logger,
        });
        Ok(())
    }

    pub fn get(&self, guardrail_name: &str) -> Option<Arc<dyn Guardrail>> {
        self.guardrails
            .iter()
            .find(|g| g.spec.guardrail_name == guardrail_name)
            .map(|g| g.guardrail.clone())
    }

    pub fn len(&self) -> usize {
        self.guardrails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guardrails.is_empty()
    }

    pub fn list_guardrails_info(&self) -> Vec<GuardrailInfoResponse> {
        self.guardrails
            .iter()
            .map(|g| GuardrailInfoResponse::from(&g.spec))
            .collect()
    }

    pub fn guardrail_info(&self, guardrail_name: &str) -> Option<GuardrailInfoResponse> {
        self.guardrails
            .iter()
            .find(|g| g.spec.guardrail_name == guardrail_name)
            .map(|g| GuardrailInfoResponse::from(&g.spec))
    }
}

impl GuardrailsService for GuardrailRegistry {
    fn applicable(&self, data: &Value, event_type: GuardrailEventHooks) -> Vec<Arc<dyn Guardrail>> {
        self.guardrails
            .iter()
            .filter(|g| {
                g.guardrail.should_run_guardrail(data, event_type)
                    || (g.guardrail.default_on() && g.guardrail.event_hooks().contains(&event_type))
            })
            .map(|g| g.guardrail.clone())
            .collect()
    }

    fn logging_callbacks(&self) -> Vec<Arc<dyn CustomLogger>> {
        self.guardrails
            .iter()
            .filter(|g| {
                g.spec
                    .litellm_params
                    .mode
                    .contains(GuardrailEventHooks::LoggingOnly)
            })
            .filter_map(|g| g.logger.clone())
            .collect()
    }
}
