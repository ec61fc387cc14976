//! The adjustment decision engine.

use super::proposals::{self, ProposalCache};
use super::quantity::{AdjustmentTarget, Direction, QuantityDetector};
use super::reconcile::{self, Adoption};
use super::rules::RuleBook;
use super::suggest::build_suggestions;
use super::{format_money, quick, AdjustError, AdjustOutcome, AdjustRequest, Intent, Proposal};
use crate::config::{LlmConfig, PricingConfig};
use crate::control::pipeline::{CallError, ProtectedClient};
use crate::estimate::{calculate_totals, Estimate, Totals};
use crate::store::{ConversationLog, EstimateStore, Role};
use crate::transport::CompletionRequest;
use std::sync::Arc;

/// Chat core: resolves intent, applies rules, consults the model, reconciles.
///
/// State machine per request; nothing is persisted beyond the response
/// except conversation history (append-only) and the proposal cache.
pub struct AdjustmentEngine {
    client: Arc<ProtectedClient>,
    store: Arc<dyn EstimateStore>,
    log: Arc<dyn ConversationLog>,
    cache: Arc<ProposalCache>,
    llm: LlmConfig,
    pricing: PricingConfig,
    rules: RuleBook,
    quantity: QuantityDetector,
}

impl AdjustmentEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<ProtectedClient>,
        store: Arc<dyn EstimateStore>,
        log: Arc<dyn ConversationLog>,
        cache: Arc<ProposalCache>,
        llm: LlmConfig,
        pricing: PricingConfig,
        rules: RuleBook,
    ) -> Self {
        Self {
            client,
            store,
            log,
            cache,
            llm,
            pricing,
            rules,
            quantity: QuantityDetector::new(),
        }
    }

    /// Process one adjustment turn.
    ///
    /// Always produces a narrative reply; only unknown-proposal, budget and
    /// storage failures surface as errors.
    pub async fn process(&self, request: AdjustRequest) -> Result<AdjustOutcome, AdjustError> {
        // Input resolution: the client's optimistic view wins over storage.
        let estimates = match &request.estimates {
            Some(provided) if !provided.is_empty() => provided.clone(),
            _ => self.store.load(&request.task_id).await?,
        };

        if estimates.is_empty() {
            return Ok(AdjustOutcome {
                reply_md: "No estimates exist yet. Upload the deliverable list and run the estimation first."
                    .to_string(),
                estimates: Vec::new(),
                totals: Totals {
                    subtotal: 0.0,
                    tax: 0.0,
                    total: 0.0,
                },
                proposals: Vec::new(),
                suggestions: Vec::new(),
            });
        }

        // Proposal-apply path: adopt a cached proposal verbatim.
        if let Some(Intent::ApplyProposal { proposal_id }) = &request.intent {
            return self.apply_proposal(&request.task_id, proposal_id).await;
        }

        // Quantified-adjustment path: generate proposals, mutate nothing.
        if let Some(message) = request.message.as_deref() {
            if let Some(target) = self.quantity.detect(message) {
                self.log.append(&request.task_id, Role::User, message).await?;
                return self
                    .quantified_adjustment(&request.task_id, &target, &estimates)
                    .await;
            }
        }

        let mut reply_parts: Vec<String> = Vec::new();
        if let Some(message) = request.message.as_deref() {
            self.log.append(&request.task_id, Role::User, message).await?;
            reply_parts.push("Request received.".to_string());
        }

        let (updated, note) = match &request.intent {
            Some(Intent::FitBudget { cap }) => {
                quick::fit_budget(&estimates, *cap, self.pricing.tax_rate)
            }
            Some(Intent::UnitCostChange { unit_cost }) => {
                quick::unit_cost_change(&estimates, *unit_cost)
            }
            Some(Intent::RiskBuffer { percent }) => quick::risk_buffer(&estimates, *percent),
            Some(Intent::ScopeReduce { keywords }) => quick::scope_reduce(&estimates, keywords),
            Some(Intent::ApplyProposal { .. }) => unreachable!("handled above"),
            None => {
                self.free_text_adjustment(&estimates, request.message.as_deref().unwrap_or(""))
                    .await?
            }
        };

        let totals = calculate_totals(&updated, self.pricing.tax_rate);

        reply_parts.push(format!("- {}", note));
        reply_parts.push(format!(
            "- Subtotal: {} / Tax: {} / Total: {}",
            format_money(totals.subtotal),
            format_money(totals.tax),
            format_money(totals.total),
        ));
        let reply_md = reply_parts.join("\n\n");

        self.log
            .append(&request.task_id, Role::Assistant, &reply_md)
            .await?;

        let suggestions = build_suggestions(if updated.is_empty() {
            &estimates
        } else {
            &updated
        });

        Ok(AdjustOutcome {
            reply_md,
            estimates: updated,
            totals,
            proposals: Vec::new(),
            suggestions,
        })
    }

    /// Adopt a cached proposal's estimate set.
    async fn apply_proposal(
        &self,
        task_id: &str,
        proposal_id: &str,
    ) -> Result<AdjustOutcome, AdjustError> {
        let proposal =
            self.cache
                .find(task_id, proposal_id)
                .ok_or_else(|| AdjustError::ProposalNotFound {
                    proposal_id: proposal_id.to_string(),
                })?;

        let totals = calculate_totals(&proposal.new_estimates, self.pricing.tax_rate);
        tracing::info!(task_id, proposal_id, "Proposal applied");

        Ok(AdjustOutcome {
            reply_md: format!("Applied the proposal \"{}\".", proposal.title),
            estimates: proposal.new_estimates,
            totals,
            proposals: Vec::new(),
            suggestions: Vec::new(),
        })
    }

    /// Generate three alternative restructurings for a quantified request.
    ///
    /// The stored estimates are never mutated here; the user must explicitly
    /// apply one of the returned proposals.
    async fn quantified_adjustment(
        &self,
        task_id: &str,
        target: &AdjustmentTarget,
        estimates: &[Estimate],
    ) -> Result<AdjustOutcome, AdjustError> {
        let proposals = self.generate_proposals(task_id, target, estimates).await?;
        let totals = calculate_totals(estimates, self.pricing.tax_rate);

        let reply_md = if proposals.is_empty() {
            "Proposal generation failed. Please try a direct instruction instead (e.g. \"Reduce testing by 20%\")."
                .to_string()
        } else {
            let direction_text = match target.direction {
                Direction::Reduce => "reduction",
                Direction::Increase => "increase",
            };
            format!(
                "Here are 3 {} proposals of about {}.\n\nPick the one that fits best; nothing is changed until you apply it.",
                direction_text,
                format_money(target.amount as f64),
            )
        };

        self.log.append(task_id, Role::Assistant, &reply_md).await?;

        Ok(AdjustOutcome {
            reply_md,
            estimates: estimates.to_vec(),
            totals,
            proposals,
            suggestions: Vec::new(),
        })
    }

    async fn generate_proposals(
        &self,
        task_id: &str,
        target: &AdjustmentTarget,
        estimates: &[Estimate],
    ) -> Result<Vec<Proposal>, AdjustError> {
        let request = CompletionRequest {
            system_prompt: proposals::proposal_system_prompt(),
            user_prompt: proposals::proposal_prompt(
                target,
                estimates,
                self.pricing.daily_unit_cost,
            ),
            model: self.llm.proposal_model.clone(),
            max_tokens: self.llm.proposal_max_tokens,
            temperature: self.llm.proposal_temperature,
            timeout: self.llm.timeout(),
        };

        let completion = match self.client.call("adjust", request).await {
            Ok(completion) => completion,
            Err(CallError::Budget(err)) => return Err(err.into()),
            Err(err) => {
                tracing::warn!(task_id, error = %err, "Proposal generation call failed");
                return Ok(Vec::new());
            }
        };

        match proposals::build_proposals(
            task_id,
            &completion.text,
            estimates,
            self.pricing.tax_rate,
        ) {
            Some(generated) => {
                self.cache.insert(task_id, generated.clone());
                tracing::info!(task_id, count = generated.len(), "Proposals cached");
                Ok(generated)
            }
            None => {
                tracing::warn!(task_id, "Proposal response was unparsable");
                Ok(Vec::new())
            }
        }
    }

    /// Free-text path: rules first, then optional model augmentation with
    /// deterministic reconciliation.
    async fn free_text_adjustment(
        &self,
        estimates: &[Estimate],
        message: &str,
    ) -> Result<(Vec<Estimate>, String), AdjustError> {
        let rule = self
            .rules
            .analyze_and_apply(estimates, message, self.pricing.daily_unit_cost);
        let mut updated = rule.estimates;
        let mut note = rule.note;

        let request = CompletionRequest {
            system_prompt: reconcile::adjust_system_prompt(),
            user_prompt: reconcile::adjust_prompt(
                message,
                &updated,
                self.pricing.daily_unit_cost,
                self.pricing.tax_rate,
            ),
            model: self.llm.model.clone(),
            max_tokens: self.llm.adjust_max_tokens,
            temperature: self.llm.adjust_temperature,
            timeout: self.llm.timeout(),
        };

        match self.client.call("adjust", request).await {
            Ok(completion) => {
                match reconcile::parse_adjustment(
                    &completion.text,
                    &updated,
                    self.pricing.daily_unit_cost,
                ) {
                    Some(model) => {
                        let adoption = reconcile::choose(
                            &updated,
                            rule.changed,
                            &model.estimates,
                            self.pricing.tax_rate,
                        );
                        if adoption == Adoption::AdoptModel {
                            updated = model.estimates;
                        }
                        let model_note = model
                            .reply_md
                            .unwrap_or_else(|| "Reflected the model's suggestion.".to_string());
                        note = format!("{}\n\n{}", note, model_note).trim().to_string();
                    }
                    None => {
                        note = format!(
                            "{}\n\n_(The model reply was unusable; kept the rule-based result.)_",
                            note
                        );
                    }
                }
            }
            Err(CallError::Budget(err)) => return Err(err.into()),
            Err(err) => {
                // Non-fatal: keep the rule result and annotate the reply.
                tracing::warn!(error = %err, "Model augmentation failed");
                note = format!(
                    "{}\n\n_(Model augmentation unavailable; kept the rule-based result.)_",
                    note
                );
            }
        }

        Ok((updated, note))
    }
}
