use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::types::call::{CallKwargs, CallType};

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("Logging hook failed: {0}")]
    HookFailed(String),

    #[error("Failed to log event: {0}")]
    LogFailed(String),

    #[error(transparent)]
    SerializationError(#[from] serde_json::Error),
}

/// Record of one finished call, as handed to loggers.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedCall {
    pub call_id: String,
    pub call_type: CallType,
    pub kwargs: CallKwargs,
    pub result: Value,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl LoggedCall {
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }
}

/// Extension point invoked after a call completes.
#[async_trait::async_trait]
pub trait CustomLogger: Send + Sync {
    fn name(&self) -> &str {
        "custom_logger"
    }

    /// Rewrites the call record before it is logged.
    ///
    /// Only the logging path sees the returned pair.
    fn logging_hook(
        &self,
        kwargs: CallKwargs,
        result: Value,
        _call_type: CallType,
    ) -> Result<(CallKwargs, Value), CallbackError> {
        Ok((kwargs, result))
    }

    async fn log_success_event(&self, _record: &LoggedCall) -> Result<(), CallbackError> {
        Ok(())
    }

    async fn log_failure_event(
        &self,
        _record: &LoggedCall,
        _error: &str,
    ) -> Result<(), CallbackError> {
        Ok(())
    }
}

/// Ordered set of loggers a pipeline reports to.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: Vec<Arc<dyn CustomLogger>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callbacks(callbacks: Vec<Arc<dyn CustomLogger>>) -> Self {
        Self { callbacks }
    }

    pub fn register(&mut self, callback: Arc<dyn CustomLogger>) {
        self.callbacks.push(callback);
    }

    pub fn extend(&mut self, callbacks: impl IntoIterator<Item = Arc<dyn CustomLogger>>) {
        self.callbacks.extend(callbacks);
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CustomLogger>> {
        self.callbacks.iter()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.callbacks.iter().map(|c| c.name()))
            .finish()
    }
}
