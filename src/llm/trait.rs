use crate::error::ProviderError;

/// A single prompt with the generation parameters it should run under
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub prompt: String,
}

/// Transport to a text-generation provider.
///
/// Implementations make exactly one attempt per call and classify failures
/// as [`ProviderError::Transient`] or [`ProviderError::Fatal`]; retrying is
/// left to [`crate::llm::TextGenerationClient`].
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the prompt and return the assistant's reply text
    async fn send(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}
