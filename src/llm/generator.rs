use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::ChatConfig;
use crate::core::errors::ApiError;
use crate::rag::PromptContext;
use super::provider::LlmProvider;
use super::types::ChatRequest;

/// Turns a built prompt into the model's raw answer text.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &PromptContext) -> Result<String, ApiError>;
}

/// Single chat-completion call with fixed sampling settings.
pub struct ChatAnswerGenerator {
    provider: Arc<dyn LlmProvider>,
    config: ChatConfig,
}

impl ChatAnswerGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: ChatConfig) -> Self {
        Self { provider, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl AnswerGenerator for ChatAnswerGenerator {
    async fn generate(&self, prompt: &PromptContext) -> Result<String, ApiError> {
        let request = ChatRequest::new(prompt.to_messages()).with_config(&self.config);
        tracing::debug!(
            provider = self.provider.name(),
            model = %self.config.model,
            "Requesting chat completion"
        );
        self.provider.chat(request, &self.config.model).await
    }
}
