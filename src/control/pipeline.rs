//! Protected model client: the one path every outbound model call takes.
//!
//! Wraps a `ModelTransport` in per-call timeout, retry with backoff, a named
//! circuit breaker, and cost accounting. Engines never talk to the transport
//! directly.

use crate::control::breaker::{BreakerError, BreakerRegistry};
use crate::control::budget::{BudgetError, CostTracker};
use crate::control::retry::RetryPolicy;
use crate::transport::{Completion, CompletionRequest, ModelTransport, TokenUsage, TransportError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure of a protected call.
#[derive(Debug, Error)]
pub enum CallError {
    /// Circuit is open; the dependency was not contacted. Callers must not
    /// retry within `retry_in`.
    #[error("'{breaker}' temporarily unavailable; retry in {retry_in:?}")]
    Unavailable { breaker: String, retry_in: Duration },

    /// Monthly budget ceiling breached; fatal, surface to the user.
    #[error(transparent)]
    Budget(#[from] BudgetError),

    /// Transport failed after exhausting retries.
    #[error(transparent)]
    Transport(TransportError),
}

/// Model client with the full protection pipeline applied per call.
pub struct ProtectedClient {
    transport: Arc<dyn ModelTransport>,
    breakers: Arc<BreakerRegistry>,
    retry: RetryPolicy,
    cost: Arc<CostTracker>,
}

impl ProtectedClient {
    pub fn new(
        transport: Arc<dyn ModelTransport>,
        breakers: Arc<BreakerRegistry>,
        retry: RetryPolicy,
        cost: Arc<CostTracker>,
    ) -> Self {
        Self {
            transport,
            breakers,
            retry,
            cost,
        }
    }

    pub fn cost_tracker(&self) -> &Arc<CostTracker> {
        &self.cost
    }

    /// Execute one completion through timeout, retry, breaker and ledger.
    ///
    /// `operation` names both the breaker ("llm_{operation}") and the metric
    /// labels. Cost is recorded for every completed attempt chain, success or
    /// failure; a breaker-open rejection never reached the provider and
    /// records nothing.
    pub async fn call(
        &self,
        operation: &str,
        request: CompletionRequest,
    ) -> Result<Completion, CallError> {
        let breaker = self.breakers.get(&format!("llm_{}", operation));

        let result = breaker
            .call(|| {
                self.retry.run(operation, || {
                    let request = request.clone();
                    async move {
                        let deadline = request.timeout;
                        match tokio::time::timeout(deadline, self.transport.complete(request)).await
                        {
                            Ok(inner) => inner,
                            Err(_) => Err(TransportError::Timeout(deadline.as_millis() as u64)),
                        }
                    }
                })
            })
            .await;

        match result {
            Ok(completion) => {
                crate::metrics::record_model_call(operation, true);
                self.cost.record(completion.usage)?;
                Ok(completion)
            }
            Err(BreakerError::Open { name, retry_in }) => {
                crate::metrics::record_model_call(operation, false);
                Err(CallError::Unavailable {
                    breaker: name,
                    retry_in,
                })
            }
            Err(BreakerError::Inner(err)) => {
                crate::metrics::record_model_call(operation, false);
                // Failed calls report zero tokens and contribute zero cost.
                self.cost.record(TokenUsage::default())?;
                Err(CallError::Transport(err))
            }
        }
    }
}
