//! Effort estimation: data model and per-deliverable estimation engine.

use serde::{Deserialize, Serialize};

pub mod engine;
pub mod fallback;
pub mod parse;
pub mod prompt;

pub use engine::{EstimateError, EstimationEngine};
pub use fallback::FallbackTable;

/// One line item of project scope, estimated independently.
///
/// `id` is the stable join key across the create/adjust/export flows; the
/// name is for display and model prompts only (duplicate names would
/// otherwise silently merge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverable {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Deliverable {
    pub fn new(id: u32, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Clarifying question with its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Estimate for one deliverable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Stable deliverable identifier (see [`Deliverable::id`]).
    pub deliverable_id: u32,
    pub deliverable_name: String,
    #[serde(default)]
    pub deliverable_description: String,
    /// Effort in person-days, >= 0.
    pub person_days: f64,
    /// Monetary amount, `person_days * daily_unit_cost` at creation time.
    pub amount: f64,
    /// Legacy combined free text, kept for older consumers.
    #[serde(default)]
    pub reasoning: String,
    /// Per-phase bullet breakdown.
    #[serde(default)]
    pub reasoning_breakdown: String,
    /// Prose caveats and assumptions.
    #[serde(default)]
    pub reasoning_notes: String,
}

/// Derived totals; recomputed on every estimate-set mutation and never
/// persisted independently of its source set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// Sum amounts and apply the configured tax rate. Pure.
pub fn calculate_totals(estimates: &[Estimate], tax_rate: f64) -> Totals {
    let subtotal: f64 = estimates.iter().map(|e| e.amount).sum();
    let tax = round2(subtotal * tax_rate);
    let total = round2(subtotal + tax);
    Totals {
        subtotal,
        tax,
        total,
    }
}

/// Round to one decimal (person-days convention).
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimals (money convention).
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
