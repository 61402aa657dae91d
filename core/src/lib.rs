pub mod error;
pub mod events;
pub mod executor;
pub mod types;

use crate::error::GatewayError;

pub type GatewayResult<T> = Result<T, GatewayError>;
