//! Shared test helpers: a scripted fake transport and engine builders.
#![allow(dead_code)]

use async_trait::async_trait;
use sekisan::config::{LlmConfig, PricingConfig};
use sekisan::control::breaker::BreakerRegistry;
use sekisan::control::budget::CostTracker;
use sekisan::control::pipeline::ProtectedClient;
use sekisan::control::retry::RetryPolicy;
use sekisan::estimate::Estimate;
use sekisan::transport::{
    Completion, CompletionRequest, ModelTransport, TokenUsage, TransportError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted transport response.
#[derive(Debug, Clone)]
pub enum Step {
    /// Respond with this text and nominal usage.
    Text(String),
    /// Fail with a transient network error.
    Fail(String),
}

/// Fake transport that replays a script of responses.
///
/// When the script runs out, the last step repeats.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_text(text: &str) -> Self {
        Self::new(vec![Step::Text(text.to_string())])
    }

    pub fn always_failing() -> Self {
        Self::new(vec![Step::Fail("simulated outage".to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelTransport for ScriptedTransport {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let step = {
            let mut steps = self.steps.lock().unwrap();
            match steps.pop_front() {
                Some(step) => {
                    *self.last.lock().unwrap() = Some(step.clone());
                    step
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or(Step::Fail("script exhausted".to_string())),
            }
        };

        match step {
            Step::Text(text) => Ok(Completion {
                text,
                usage: TokenUsage {
                    input_tokens: 1000,
                    output_tokens: 500,
                },
            }),
            Step::Fail(message) => Err(TransportError::Network(message)),
        }
    }
}

/// Retry policy with negligible delays for tests.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(1), 2.0)
}

/// Protected client over a scripted transport with generous limits.
pub fn protected_client(transport: Arc<ScriptedTransport>) -> Arc<ProtectedClient> {
    protected_client_with(
        transport,
        Arc::new(BreakerRegistry::new(100, Duration::from_secs(60))),
        fast_retry(2),
    )
}

pub fn protected_client_with(
    transport: Arc<ScriptedTransport>,
    breakers: Arc<BreakerRegistry>,
    retry: RetryPolicy,
) -> Arc<ProtectedClient> {
    Arc::new(ProtectedClient::new(
        transport,
        breakers,
        retry,
        Arc::new(CostTracker::new(0.15, 0.60, 10.0, 200.0)),
    ))
}

pub fn llm_config() -> LlmConfig {
    LlmConfig::default()
}

pub fn jpy_pricing() -> PricingConfig {
    PricingConfig::default()
}

/// Estimate helper with the JPY default unit cost.
pub fn estimate(id: u32, name: &str, person_days: f64) -> Estimate {
    Estimate {
        deliverable_id: id,
        deliverable_name: name.to_string(),
        deliverable_description: String::new(),
        person_days,
        amount: person_days * 40_000.0,
        reasoning: String::new(),
        reasoning_breakdown: String::new(),
        reasoning_notes: String::new(),
    }
}
