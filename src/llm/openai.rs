use crate::error::ProviderError;
use crate::llm::{ChatBackend, CompletionRequest};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Chat completions over an OpenAI-compatible HTTP API
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiBackend {
    /// Create a backend for the given API root, e.g. `https://api.openai.com/v1`
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Rate limits, timeouts and server errors are worth retrying; everything
/// else (bad request, bad credentials, unknown model) is not.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let message = format!("provider returned {}: {}", status, body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        ProviderError::Transient(message)
    } else {
        ProviderError::Fatal(message)
    }
}

fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_builder() {
        ProviderError::Fatal(format!("could not build provider request: {}", err))
    } else {
        ProviderError::Transient(format!("could not reach provider: {}", err))
    }
}

fn extract_reply(response: ChatResponse) -> Result<String, ProviderError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| ProviderError::Fatal("provider response contained no message".to_string()))
}

#[async_trait::async_trait]
impl ChatBackend for OpenAiBackend {
    async fn send(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_text));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                ProviderError::Fatal(format!("failed to parse chat completion response: {}", e))
            } else {
                ProviderError::Transient(format!("failed to read chat completion response: {}", e))
            }
        })?;

        extract_reply(parsed)
    }
}
