//! Deterministic quick actions. No model call involved.

use super::format_money;
use crate::estimate::{calculate_totals, round1, Estimate};

/// Scale all person-days/amounts down to fit `cap` if the current total
/// (including tax) exceeds it; otherwise a no-op.
///
/// The scale factor is clamped to 0.1 so a tiny cap can't erase the plan.
pub fn fit_budget(estimates: &[Estimate], cap: f64, tax_rate: f64) -> (Vec<Estimate>, String) {
    let current = calculate_totals(estimates, tax_rate).total;
    if current <= cap {
        let note = format!(
            "The current total of {} is already within the cap of {}; no adjustment needed.",
            format_money(current),
            format_money(cap)
        );
        return (estimates.to_vec(), note);
    }

    let ratio = (cap / current).max(0.1);
    let out: Vec<Estimate> = estimates
        .iter()
        .map(|e| {
            let person_days = round1(e.person_days * ratio);
            // Preserve each item's implied unit cost.
            let denom = if e.person_days == 0.0 {
                1.0
            } else {
                e.person_days.max(0.1)
            };
            let amount = person_days * (e.amount / denom);
            Estimate {
                person_days,
                amount,
                ..e.clone()
            }
        })
        .collect();

    let new_total = calculate_totals(&out, tax_rate).total;
    let note = format!(
        "Total {} -> {} (applied factor {:.2} to fit the cap of {}).",
        format_money(current),
        format_money(new_total),
        ratio,
        format_money(cap)
    );
    (out, note)
}

/// Recompute every amount as `person_days * new_unit_cost`.
pub fn unit_cost_change(estimates: &[Estimate], new_unit_cost: f64) -> (Vec<Estimate>, String) {
    let out: Vec<Estimate> = estimates
        .iter()
        .map(|e| Estimate {
            amount: e.person_days * new_unit_cost,
            ..e.clone()
        })
        .collect();
    let note = format!(
        "Changed the unit cost to {}/person-day.",
        format_money(new_unit_cost)
    );
    (out, note)
}

/// Multiply every amount by `1 + percent/100`.
pub fn risk_buffer(estimates: &[Estimate], percent: f64) -> (Vec<Estimate>, String) {
    let factor = 1.0 + percent / 100.0;
    let out: Vec<Estimate> = estimates
        .iter()
        .map(|e| Estimate {
            amount: e.amount * factor,
            ..e.clone()
        })
        .collect();
    let note = format!("Added a {:.1}% risk buffer on top of every amount.", percent);
    (out, note)
}

/// Remove every estimate whose name contains any keyword
/// (case-insensitive substring).
pub fn scope_reduce(estimates: &[Estimate], keywords: &[String]) -> (Vec<Estimate>, String) {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    if keywords.is_empty() {
        return (
            estimates.to_vec(),
            "No keywords were given for scope reduction.".to_string(),
        );
    }

    let mut removed = Vec::new();
    let out: Vec<Estimate> = estimates
        .iter()
        .filter(|e| {
            let name = e.deliverable_name.to_lowercase();
            if keywords.iter().any(|k| name.contains(k)) {
                removed.push(e.deliverable_name.clone());
                false
            } else {
                true
            }
        })
        .cloned()
        .collect();

    let note = if removed.is_empty() {
        "Removed: none".to_string()
    } else {
        format!("Removed: {}", removed.join(", "))
    };
    (out, note)
}
