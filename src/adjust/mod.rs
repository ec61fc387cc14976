//! Chat-based estimate adjustment.
//!
//! Decides what a free-text or structured adjustment request means, applies
//! deterministic rules, optionally asks the model for proposals or a
//! reconciled estimate set, and merges the two deterministically.

use crate::control::budget::BudgetError;
use crate::estimate::{Estimate, Totals};
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod engine;
pub mod proposals;
pub mod quantity;
pub mod quick;
pub mod reconcile;
pub mod rules;
pub mod suggest;

pub use engine::AdjustmentEngine;
pub use proposals::ProposalCache;
pub use quantity::{AdjustmentTarget, Direction, QuantityDetector};
pub use rules::RuleBook;
pub use suggest::{Suggestion, SuggestionPayload};

/// Structured quick actions; deterministic, no model call.
///
/// Serialized as `{"intent": "...", "params": {...}}`, matching the wire
/// shape the presentation layer sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "params", rename_all = "snake_case")]
pub enum Intent {
    /// Scale everything down to fit a budget cap.
    FitBudget { cap: f64 },
    /// Recompute every amount at a new daily unit cost.
    UnitCostChange { unit_cost: f64 },
    /// Multiply every amount by `1 + percent/100`.
    RiskBuffer { percent: f64 },
    /// Remove estimates whose name contains any keyword.
    ScopeReduce { keywords: Vec<String> },
    /// Adopt a previously generated proposal verbatim.
    ApplyProposal { proposal_id: String },
}

/// One adjustment turn.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdjustRequest {
    pub task_id: String,
    /// Free-text instruction, if any.
    pub message: Option<String>,
    /// Structured intent, if any. Takes precedence over free text.
    pub intent: Option<Intent>,
    /// Client's current optimistic view; used instead of the stored set
    /// when present.
    pub estimates: Option<Vec<Estimate>>,
}

/// Per-deliverable delta inside a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalChange {
    pub deliverable_name: String,
    pub person_days_before: f64,
    pub person_days_after: f64,
    pub amount_before: f64,
    pub amount_after: f64,
    pub reasoning: String,
}

/// A complete alternative estimate set generated to meet a target budget
/// delta, held in memory until the user explicitly applies one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Signed net change, recomputed from actual subtotals.
    pub target_amount_change: i64,
    pub changes: Vec<ProposalChange>,
    pub new_estimates: Vec<Estimate>,
}

/// Result of one adjustment turn.
#[derive(Debug, Clone, Serialize)]
pub struct AdjustOutcome {
    /// Narrative Markdown reply; always present.
    pub reply_md: String,
    pub estimates: Vec<Estimate>,
    pub totals: Totals,
    /// Alternative restructurings awaiting explicit apply; usually empty.
    pub proposals: Vec<Proposal>,
    /// UI quick-suggestion chips.
    pub suggestions: Vec<Suggestion>,
}

/// Adjustment failures that surface as distinct, actionable errors.
/// Everything else degrades into the narrative reply.
#[derive(Debug, Error)]
pub enum AdjustError {
    #[error("Proposal '{proposal_id}' not found")]
    ProposalNotFound { proposal_id: String },

    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Format a monetary amount with thousands separators, dropping fractions.
pub(crate) fn format_money(value: f64) -> String {
    let negative = value < 0.0;
    let mut digits = format!("{}", value.abs().round() as u64);
    let mut i = digits.len();
    while i > 3 {
        i -= 3;
        digits.insert(i, ',');
    }
    if negative {
        format!("-{}", digits)
    } else {
        digits
    }
}

/// Lenient numeric coercion for model-provided values.
///
/// Accepts numbers and strings with currency/percent decorations
/// (e.g. "1,200,000円").
pub(crate) fn coerce_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, ',' | '円' | '%' | '％') && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}
