//! Proposal generation and the in-memory proposal cache.
//!
//! Proposals are complete alternative estimate sets produced for a
//! quantified adjustment request. They are cached per task until the user
//! explicitly applies one; they never mutate the stored estimates on their
//! own.

use super::quantity::{AdjustmentTarget, Direction};
use super::{coerce_number, Proposal, ProposalChange};
use crate::estimate::parse::extract_json_object;
use crate::estimate::{calculate_totals, Estimate};
use dashmap::DashMap;
use serde::Deserialize;

/// Process-wide proposal cache keyed by task id.
///
/// Concurrent writes for the same task are last-writer-wins; the UI flow is
/// single-user-per-task. Entries live until evicted or process exit;
/// proposals do not survive a restart.
#[derive(Default)]
pub struct ProposalCache {
    inner: DashMap<String, Vec<Proposal>>,
}

impl ProposalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task_id: &str, proposals: Vec<Proposal>) {
        self.inner.insert(task_id.to_string(), proposals);
    }

    pub fn get(&self, task_id: &str) -> Vec<Proposal> {
        self.inner
            .get(task_id)
            .map(|p| p.value().clone())
            .unwrap_or_default()
    }

    pub fn find(&self, task_id: &str, proposal_id: &str) -> Option<Proposal> {
        self.get(task_id).into_iter().find(|p| p.id == proposal_id)
    }

    pub fn evict(&self, task_id: &str) {
        self.inner.remove(task_id);
    }
}

/// System prompt for proposal generation.
pub fn proposal_system_prompt() -> String {
    "You are a senior project manager restructuring estimates. \
Respond with strictly formatted JSON only."
        .to_string()
}

/// Prompt asking for exactly 3 restructurings near the target delta.
pub fn proposal_prompt(
    target: &AdjustmentTarget,
    current_estimates: &[Estimate],
    unit_cost: f64,
) -> String {
    let direction_text = match target.direction {
        Direction::Reduce => "reduce",
        Direction::Increase => "increase",
    };

    let summary = serde_json::to_string_pretty(
        &current_estimates
            .iter()
            .map(|e| {
                serde_json::json!({
                    "deliverable_name": e.deliverable_name,
                    "person_days": e.person_days,
                    "amount": e.amount,
                })
            })
            .collect::<Vec<_>>(),
    )
    .unwrap_or_default();

    format!(
        r#"Create exactly 3 proposals that {direction} the following estimate by about {amount}.

[Current estimates]
{summary}

[Request]
- Direction: {direction}
- Target change: {amount}

[Output format]
Return only the following JSON, without a code block:
{{
  "proposals": [
    {{
      "title": "short proposal title",
      "description": "summary of the proposal",
      "target_amount_change": -120000,
      "changes": [
        {{
          "deliverable_name": "name",
          "person_days_before": 3.0,
          "person_days_after": 1.0,
          "amount_before": 120000,
          "amount_after": 40000,
          "reasoning": "concise reason for the change"
        }}
      ]
    }}
  ]
}}

[Constraints]
1. When reducing, cut low-priority, low-risk items first (operation manuals, testing, documentation are candidates).
2. When increasing, add or strengthen high-value related items (security, performance, quality are candidates).
3. Each proposal's net change must land within +/-20% of the target.
4. Keep the reasoning logically consistent.
5. When reducing, only use deliverable names that exist in the current estimates.
6. When increasing, new deliverables may be added (e.g. security hardening, performance monitoring, backups).
7. Compute amounts at {unit_cost} per person-day."#,
        direction = direction_text,
        amount = super::format_money(target.amount as f64),
        summary = summary,
        unit_cost = super::format_money(unit_cost),
    )
}

/// Raw model output shapes. Numbers arrive as JSON numbers or decorated
/// strings, so fields stay `Value` until coercion.
#[derive(Debug, Deserialize)]
struct RawProposalsResponse {
    #[serde(default)]
    proposals: Vec<RawProposal>,
}

#[derive(Debug, Deserialize)]
struct RawProposal {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    changes: Vec<RawChange>,
}

#[derive(Debug, Deserialize)]
struct RawChange {
    #[serde(default)]
    deliverable_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    person_days_before: Option<serde_json::Value>,
    #[serde(default)]
    person_days_after: Option<serde_json::Value>,
    #[serde(default)]
    amount_before: Option<serde_json::Value>,
    #[serde(default)]
    amount_after: Option<serde_json::Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parse and materialize proposals from raw model text.
///
/// At most 3 proposals are kept. Each proposal's `new_estimates` is computed
/// by applying its changes to the current set, and the net change is
/// recomputed from actual subtotals; the model's own delta figure is never
/// trusted.
pub fn build_proposals(
    task_id: &str,
    raw_text: &str,
    current_estimates: &[Estimate],
    tax_rate: f64,
) -> Option<Vec<Proposal>> {
    let json = extract_json_object(raw_text)?;
    let parsed: RawProposalsResponse = serde_json::from_str(json).ok()?;

    let current_subtotal = calculate_totals(current_estimates, tax_rate).subtotal;

    let proposals = parsed
        .proposals
        .into_iter()
        .take(3)
        .enumerate()
        .map(|(i, raw)| {
            let changes: Vec<ProposalChange> = raw
                .changes
                .iter()
                .map(|c| ProposalChange {
                    deliverable_name: c.deliverable_name.clone().unwrap_or_default(),
                    person_days_before: c
                        .person_days_before
                        .as_ref()
                        .and_then(coerce_number)
                        .unwrap_or(0.0),
                    person_days_after: c
                        .person_days_after
                        .as_ref()
                        .and_then(coerce_number)
                        .unwrap_or(0.0),
                    amount_before: c
                        .amount_before
                        .as_ref()
                        .and_then(coerce_number)
                        .unwrap_or(0.0),
                    amount_after: c
                        .amount_after
                        .as_ref()
                        .and_then(coerce_number)
                        .unwrap_or(0.0),
                    reasoning: c.reasoning.clone().unwrap_or_default(),
                })
                .collect();

            let descriptions: Vec<Option<String>> =
                raw.changes.iter().map(|c| c.description.clone()).collect();
            let new_estimates =
                apply_changes(current_estimates, &changes, &descriptions);
            let new_subtotal = calculate_totals(&new_estimates, tax_rate).subtotal;
            let actual_change = (new_subtotal - current_subtotal).round() as i64;

            Proposal {
                id: format!("proposal_{}_{}", task_id, i + 1),
                title: raw.title.unwrap_or_else(|| format!("Proposal {}", i + 1)),
                description: raw.description.unwrap_or_default(),
                target_amount_change: actual_change,
                changes,
                new_estimates,
            }
        })
        .collect::<Vec<_>>();

    if proposals.is_empty() {
        None
    } else {
        Some(proposals)
    }
}

/// Apply per-deliverable changes to a copy of the current estimate set.
///
/// Existing rows are matched by name; unmatched changes with positive effort
/// become new rows (the increase case). Rows whose amount drops to zero are
/// removed from the result.
pub fn apply_changes(
    current: &[Estimate],
    changes: &[ProposalChange],
    descriptions: &[Option<String>],
) -> Vec<Estimate> {
    let mut out: Vec<Estimate> = current.to_vec();
    let mut next_id = current
        .iter()
        .map(|e| e.deliverable_id)
        .max()
        .map(|m| m + 1)
        .unwrap_or(0);

    for (i, change) in changes.iter().enumerate() {
        let found = out
            .iter_mut()
            .find(|e| e.deliverable_name == change.deliverable_name);

        match found {
            Some(existing) => {
                existing.person_days = change.person_days_after;
                existing.amount = change.amount_after;
                if !change.reasoning.is_empty() {
                    let base = if existing.reasoning_notes.is_empty() {
                        existing.reasoning.clone()
                    } else {
                        existing.reasoning_notes.clone()
                    };
                    existing.reasoning_notes =
                        format!("{}\n\nAdjustment: {}", base, change.reasoning)
                            .trim()
                            .to_string();
                }
            }
            None if change.person_days_after > 0.0 => {
                out.push(Estimate {
                    deliverable_id: next_id,
                    deliverable_name: change.deliverable_name.clone(),
                    deliverable_description: descriptions
                        .get(i)
                        .cloned()
                        .flatten()
                        .unwrap_or_default(),
                    person_days: change.person_days_after,
                    amount: change.amount_after,
                    reasoning: change.reasoning.clone(),
                    reasoning_breakdown: change.reasoning.clone(),
                    reasoning_notes: format!("Added deliverable: {}", change.reasoning),
                });
                next_id += 1;
            }
            None => {}
        }
    }

    out.into_iter().filter(|e| e.amount > 0.0).collect()
}
