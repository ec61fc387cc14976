//! Model transport abstraction.
//!
//! This module provides the `ModelTransport` trait that abstracts the raw
//! LLM provider call. Everything above it (retry, circuit breaking, cost
//! tracking, parsing, fallbacks) is owned by this crate; the transport only
//! moves a prompt pair to the provider and a text response back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod error;
pub mod openai;

pub use error::TransportError;
pub use openai::OpenAiTransport;

/// A single completion request.
///
/// Prompts are already fully rendered; the transport never edits them.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt (role instructions).
    pub system_prompt: String,

    /// User prompt (task content).
    pub user_prompt: String,

    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,

    /// Maximum completion tokens.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Per-call deadline. A hung call is failed, not left to block.
    pub timeout: Duration,
}

/// Token usage counters reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A completed model call: raw text plus usage for cost accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Opaque model call: `(prompts, params) -> raw text + usage`.
///
/// Object-safe so engines can hold an `Arc<dyn ModelTransport>`. All async
/// methods are cancellation-safe; dropping the future aborts any in-flight
/// HTTP request.
#[async_trait]
pub trait ModelTransport: Send + Sync + 'static {
    /// Execute a non-streaming completion request.
    ///
    /// # Returns
    ///
    /// - `Ok(Completion)` on success
    /// - `Err(TransportError::Upstream)` if the provider returned 4xx/5xx
    /// - `Err(TransportError::Network)` if the connection failed
    /// - `Err(TransportError::Timeout)` if the request exceeded its deadline
    /// - `Err(TransportError::InvalidResponse)` on an unexpected body shape
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, TransportError>;
}
