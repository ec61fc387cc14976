//! Per-deliverable estimation through the protection pipeline.

use super::fallback::FallbackTable;
use super::parse;
use super::prompt;
use super::{round1, Deliverable, Estimate, QaPair};
use crate::config::{LlmConfig, PricingConfig};
use crate::control::budget::BudgetError;
use crate::control::pipeline::{CallError, ProtectedClient};
use crate::transport::CompletionRequest;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Fatal estimation errors.
///
/// Model failures never appear here: a deliverable whose calls exhaust the
/// pipeline degrades to the keyword heuristic instead of failing the batch.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error(transparent)]
    Budget(#[from] BudgetError),
}

/// Orchestrates parallel per-deliverable model calls.
pub struct EstimationEngine {
    client: Arc<ProtectedClient>,
    llm: LlmConfig,
    pricing: PricingConfig,
    fallback: FallbackTable,
    max_parallel: usize,
}

impl EstimationEngine {
    pub fn new(
        client: Arc<ProtectedClient>,
        llm: LlmConfig,
        pricing: PricingConfig,
        fallback: FallbackTable,
        max_parallel: usize,
    ) -> Self {
        Self {
            client,
            llm,
            pricing,
            fallback,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Estimate every deliverable, in parallel up to the configured cap.
    ///
    /// Dispatch is order-independent; the output is re-sorted to submission
    /// order before returning. Always returns a complete estimate set unless
    /// the monthly budget ceiling is breached, which aborts the batch.
    pub async fn generate_estimates(
        &self,
        deliverables: &[Deliverable],
        requirements: &str,
        qa_pairs: &[QaPair],
    ) -> Result<Vec<Estimate>, EstimateError> {
        let qa_text = prompt::format_qa_pairs(qa_pairs);
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));

        tracing::info!(
            count = deliverables.len(),
            max_parallel = self.max_parallel,
            model = %self.llm.model,
            "Estimation batch started"
        );

        let workers = deliverables.iter().enumerate().map(|(index, deliverable)| {
            let semaphore = semaphore.clone();
            let qa_text = qa_text.as_str();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("estimation semaphore closed");
                let estimate = self
                    .estimate_single(deliverable, requirements, qa_text)
                    .await;
                (index, estimate)
            }
        });

        let mut indexed = futures::future::join_all(workers).await;
        indexed.sort_by_key(|(index, _)| *index);

        let mut estimates = Vec::with_capacity(indexed.len());
        for (_, result) in indexed {
            estimates.push(result?);
        }

        tracing::info!(count = estimates.len(), "Estimation batch complete");
        Ok(estimates)
    }

    /// Estimate one deliverable, degrading to the keyword heuristic on any
    /// non-budget failure.
    async fn estimate_single(
        &self,
        deliverable: &Deliverable,
        requirements: &str,
        qa_text: &str,
    ) -> Result<Estimate, EstimateError> {
        let request = CompletionRequest {
            system_prompt: prompt::estimate_system_prompt(),
            user_prompt: prompt::estimate_prompt(deliverable, requirements, qa_text),
            model: self.llm.model.clone(),
            max_tokens: self.llm.estimate_max_tokens,
            temperature: self.llm.estimate_temperature,
            timeout: self.llm.timeout(),
        };

        match self.client.call("estimate", request).await {
            Ok(completion) => match parse::parse_estimate_response(&completion.text) {
                Ok(parsed) => Ok(self.build_estimate(deliverable, parsed)),
                Err(err) => {
                    tracing::warn!(
                        deliverable = %deliverable.name,
                        error = %err,
                        "Unparsable estimation response; using keyword fallback"
                    );
                    Ok(self.fallback_estimate(deliverable, &err.to_string()))
                }
            },
            Err(CallError::Budget(err)) => Err(err.into()),
            Err(err) => {
                tracing::warn!(
                    deliverable = %deliverable.name,
                    error = %err,
                    "Model unavailable; using keyword fallback"
                );
                Ok(self.fallback_estimate(deliverable, &err.to_string()))
            }
        }
    }

    fn build_estimate(&self, deliverable: &Deliverable, parsed: parse::ParsedEstimate) -> Estimate {
        let person_days = round1(parsed.person_days);
        Estimate {
            deliverable_id: deliverable.id,
            deliverable_name: deliverable.name.clone(),
            deliverable_description: deliverable.description.clone(),
            person_days,
            amount: person_days * self.pricing.daily_unit_cost,
            reasoning: parsed.reasoning,
            reasoning_breakdown: parsed.reasoning_breakdown,
            reasoning_notes: parsed.reasoning_notes,
        }
    }

    /// Keyword-heuristic estimate recording the triggering error for
    /// traceability.
    fn fallback_estimate(&self, deliverable: &Deliverable, error: &str) -> Estimate {
        crate::metrics::record_fallback("estimate");
        let person_days = self
            .fallback
            .estimate(&deliverable.name, &deliverable.description);

        Estimate {
            deliverable_id: deliverable.id,
            deliverable_name: deliverable.name.clone(),
            deliverable_description: deliverable.description.clone(),
            person_days,
            amount: person_days * self.pricing.daily_unit_cost,
            reasoning: format!("Keyword-based default estimate ({} person-days)", person_days),
            reasoning_breakdown: format!("- Default estimate: {} person-days", person_days),
            reasoning_notes: format!(
                "The model estimate was unavailable, so a keyword-based default was used.\nError: {}",
                error
            ),
        }
    }
}
