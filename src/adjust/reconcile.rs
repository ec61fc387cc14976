//! Reconciliation between rule-derived and model-derived estimate sets.

use super::coerce_number;
use crate::estimate::parse::extract_json_object;
use crate::estimate::{calculate_totals, Estimate};
use serde::Deserialize;
use std::collections::HashMap;

/// Per-deliverable difference thresholds: below these, two sets count as
/// the same result.
const PERSON_DAYS_EPSILON: f64 = 0.05;
const AMOUNT_EPSILON: f64 = 0.5;

/// Whether two estimate sets differ materially.
///
/// Sets are diffed per deliverable by lowercased name; a length mismatch or
/// an unmatched name counts as a difference.
pub fn differs(a: &[Estimate], b: &[Estimate]) -> bool {
    if a.len() != b.len() {
        return true;
    }

    let by_name: HashMap<String, &Estimate> = a
        .iter()
        .map(|e| (e.deliverable_name.to_lowercase(), e))
        .collect();

    for other in b {
        match by_name.get(&other.deliverable_name.to_lowercase()) {
            None => return true,
            Some(ours) => {
                if (ours.person_days - other.person_days).abs() >= PERSON_DAYS_EPSILON {
                    return true;
                }
                if (ours.amount - other.amount).abs() >= AMOUNT_EPSILON {
                    return true;
                }
            }
        }
    }
    false
}

/// Which result an adjustment turn should adopt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adoption {
    KeepRules,
    AdoptModel,
}

/// Decide between the rule result and the model result.
///
/// Identical results keep the rules. When rules changed nothing, a differing
/// model result is adopted unconditionally; when rules did change something,
/// the model result wins only by making the total strictly cheaper.
pub fn choose(
    rule_estimates: &[Estimate],
    rules_changed: bool,
    model_estimates: &[Estimate],
    tax_rate: f64,
) -> Adoption {
    if !differs(model_estimates, rule_estimates) {
        return Adoption::KeepRules;
    }

    if !rules_changed {
        tracing::debug!("Adopting model result (rules produced no change)");
        return Adoption::AdoptModel;
    }

    let model_total = calculate_totals(model_estimates, tax_rate).total;
    let rule_total = calculate_totals(rule_estimates, tax_rate).total;

    if model_total < rule_total - 1e-3 {
        tracing::debug!(
            rule_total,
            model_total,
            "Adopting model result (total improved)"
        );
        Adoption::AdoptModel
    } else {
        tracing::debug!(
            rule_total,
            model_total,
            "Keeping rule result (model total not lower)"
        );
        Adoption::KeepRules
    }
}

/// System prompt for the free-text adjustment call.
pub fn adjust_system_prompt() -> String {
    "You are a senior project manager who replies in strict formats. \
Adjust estimates consistently and return JSON only."
        .to_string()
}

/// Prompt asking the model for a fully reconciled estimate set.
pub fn adjust_prompt(
    message: &str,
    estimates: &[Estimate],
    unit_cost: f64,
    tax_rate: f64,
) -> String {
    let current = serde_json::to_string(
        &estimates
            .iter()
            .map(|e| {
                serde_json::json!({
                    "deliverable_name": e.deliverable_name,
                    "deliverable_description": e.deliverable_description,
                    "person_days": e.person_days,
                    "amount": e.amount,
                    "reasoning": e.reasoning,
                })
            })
            .collect::<Vec<_>>(),
    )
    .unwrap_or_default();

    format!(
        r#"Below are the current estimates. Adjust person_days and amount so they stay consistent at a unit cost of {unit_cost} per person-day, and improve the set according to the request.
Return JSON only, no code block. Fields: reply_md, estimates (array), totals.
Each estimates element is {{deliverable_name, deliverable_description, person_days (one decimal), amount (number), reasoning (short Markdown allowed)}}.
totals is {{subtotal, tax, total}} with a tax rate of {tax_percent:.0}%.

Request:
{message}

Current estimates (JSON):
{current}"#,
        unit_cost = super::format_money(unit_cost),
        tax_percent = tax_rate * 100.0,
        message = message,
        current = current,
    )
}

#[derive(Debug, Deserialize)]
struct RawAdjustmentResponse {
    #[serde(default)]
    reply_md: Option<String>,
    #[serde(default)]
    estimates: Vec<RawAdjustedEstimate>,
}

#[derive(Debug, Deserialize)]
struct RawAdjustedEstimate {
    #[serde(default)]
    deliverable_name: Option<String>,
    #[serde(default)]
    deliverable_description: Option<String>,
    #[serde(default)]
    person_days: Option<serde_json::Value>,
    #[serde(default)]
    amount: Option<serde_json::Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parsed model adjustment: normalized estimates plus the model's narrative.
#[derive(Debug)]
pub struct ModelAdjustment {
    pub estimates: Vec<Estimate>,
    pub reply_md: Option<String>,
}

/// Parse the model's reconciled estimate set.
///
/// Numbers are coerced leniently (strings with commas or currency marks are
/// accepted); a missing amount falls back to `person_days * unit_cost`.
/// Deliverable ids are reattached by name from `reference`; genuinely new
/// names get fresh ids. Returns `None` when no usable estimate list parses
/// out, which the caller treats as a non-fatal model failure.
pub fn parse_adjustment(
    raw_text: &str,
    reference: &[Estimate],
    unit_cost: f64,
) -> Option<ModelAdjustment> {
    let json = extract_json_object(raw_text)?;
    let parsed: RawAdjustmentResponse = serde_json::from_str(json).ok()?;
    if parsed.estimates.is_empty() {
        return None;
    }

    let by_name: HashMap<String, &Estimate> = reference
        .iter()
        .map(|e| (e.deliverable_name.to_lowercase(), e))
        .collect();
    let mut next_id = reference
        .iter()
        .map(|e| e.deliverable_id)
        .max()
        .map(|m| m + 1)
        .unwrap_or(0);

    let estimates = parsed
        .estimates
        .into_iter()
        .map(|raw| {
            let name = raw.deliverable_name.unwrap_or_default();
            let person_days = raw
                .person_days
                .as_ref()
                .and_then(coerce_number)
                .unwrap_or(0.0);
            let amount = raw
                .amount
                .as_ref()
                .and_then(coerce_number)
                .unwrap_or(person_days * unit_cost);

            let known = by_name.get(&name.to_lowercase());
            let deliverable_id = known.map(|e| e.deliverable_id).unwrap_or_else(|| {
                let id = next_id;
                next_id += 1;
                id
            });
            let description = raw.deliverable_description.unwrap_or_else(|| {
                known
                    .map(|e| e.deliverable_description.clone())
                    .unwrap_or_default()
            });

            Estimate {
                deliverable_id,
                deliverable_name: name,
                deliverable_description: description,
                person_days,
                amount,
                reasoning: raw.reasoning.unwrap_or_default(),
                reasoning_breakdown: known
                    .map(|e| e.reasoning_breakdown.clone())
                    .unwrap_or_default(),
                reasoning_notes: known
                    .map(|e| e.reasoning_notes.clone())
                    .unwrap_or_default(),
            }
        })
        .collect();

    Some(ModelAdjustment {
        estimates,
        reply_md: parsed.reply_md,
    })
}
