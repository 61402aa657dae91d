use std::collections::HashMap;
use std::path::Path;

use minijinja::Environment;
use serde::{Deserialize, Serialize};
use switchyard_core::types::guardrails::GuardrailSpec;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse guardrails config. Error: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("Failed to read template in config. Error: {0}")]
    ReadError(#[from] minijinja::Error),
    #[error("Failed to read config file. Error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct GuardrailsConfig {
    #[serde(default)]
    pub guardrails: Vec<GuardrailSpec>,
}

/// Load guardrails from a YAML configuration string
pub fn load_guardrails_from_yaml(yaml_str: &str) -> Result<Vec<GuardrailSpec>, serde_yaml::Error> {
    let config: GuardrailsConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config.guardrails)
}

/// Load the default guardrails from the embedded configuration
pub fn load_default_guardrails() -> Result<HashMap<String, GuardrailSpec>, serde_yaml::Error> {
    let default_config = include_str!("config/default_guardrails.yaml");
    let guardrails = load_guardrails_from_yaml(default_config)?;
    Ok(guardrails
        .into_iter()
        .map(|g| (g.guardrail_name.clone(), g))
        .collect())
}

fn replace_env_vars(content: &str) -> Result<String, ConfigError> {
    let env = Environment::new();
    let template = env.template_from_str(content)?;
    let parameters = template.undeclared_variables(false);

    let mut variables = HashMap::new();
    parameters.iter().for_each(|k| {
        if let Ok(v) = std::env::var(k) {
            variables.insert(k, v);
        };
    });

    Ok(template.render(variables)?)
}

impl GuardrailsConfig {
    /// Parses YAML after substituting `{{ VAR }}` with environment variables
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let content = replace_env_vars(content)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Reads a config file; a missing file is an empty config
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(config_path.as_ref()) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    path = %config_path.as_ref().display(),
                    "Guardrails config not found, starting without guardrails"
                );
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}
