use crate::types::gateway::{ChatCompletionRequest, ChatCompletionResponse};
use crate::GatewayResult;

pub mod completion;

#[cfg(test)]
mod tests;

pub use completion::CompletionExecutor;

/// Backend that answers chat completion requests
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<ChatCompletionResponse>;
}

/// Provider that answers every request with the same text
#[derive(Debug, Clone)]
pub struct MockProvider {
    response: String,
}

impl MockProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait::async_trait]
impl ModelProvider for MockProvider {
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<ChatCompletionResponse> {
        Ok(ChatCompletionResponse::mock(
            request.model.clone(),
            self.response.clone(),
        ))
    }
}
