pub mod custom;
pub mod guards;
pub mod registry;


pub use custom::CustomGuardrail;
pub use guards::config::{load_guardrails_from_yaml, GuardrailsConfig};
pub use registry::GuardrailRegistry;
