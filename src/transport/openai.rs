//! OpenAI-compatible transport implementation.
//!
//! Speaks the `/v1/chat/completions` protocol with Bearer authentication,
//! which also covers the many local and hosted providers that expose the
//! same surface.

use super::{Completion, CompletionRequest, ModelTransport, TokenUsage, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// OpenAI-compatible chat-completions transport.
pub struct OpenAiTransport {
    /// Base URL (e.g., "https://api.openai.com").
    base_url: String,
    /// API key for Bearer authentication.
    api_key: String,
    /// Shared HTTP client for connection pooling.
    client: Arc<Client>,
}

impl OpenAiTransport {
    pub fn new(base_url: String, api_key: String, client: Arc<Client>) -> Self {
        Self {
            base_url,
            api_key,
            client,
        }
    }
}

/// OpenAI chat-completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

/// OpenAI chat-completions response body.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[async_trait]
impl ModelTransport for OpenAiTransport {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, TransportError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let timeout_ms = request.timeout.as_millis() as u64;

        let body = ChatRequest {
            model: request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: request.user_prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(timeout_ms)
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(TransportError::RateLimited(message));
            }
            return Err(TransportError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            TransportError::InvalidResponse(format!("failed to parse completion response: {}", e))
        })?;

        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| TransportError::InvalidResponse("response has no choices".into()))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(Completion {
            text: text.trim().to_string(),
            usage,
        })
    }
}
