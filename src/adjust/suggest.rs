//! Quick-suggestion chips for the presentation layer.

use super::Intent;
use crate::estimate::Estimate;
use serde::Serialize;

/// One suggestion chip: a label plus the payload the UI sends back when the
/// chip is tapped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub label: String,
    pub payload: SuggestionPayload,
}

/// Chip payloads mirror the two request kinds: a free-text message or a
/// structured intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SuggestionPayload {
    Message {
        message: String,
    },
    Intent {
        #[serde(flatten)]
        intent: Intent,
    },
}

/// Build the fixed-shape suggestion list for the current estimate set.
///
/// The top three deliverables by amount each get a reduce-20% and an exclude
/// chip, followed by the generic chips.
pub fn build_suggestions(estimates: &[Estimate]) -> Vec<Suggestion> {
    let mut by_amount: Vec<&Estimate> = estimates.iter().collect();
    by_amount.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut names: Vec<&str> = Vec::new();
    for e in by_amount {
        let name = e.deliverable_name.as_str();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
        if names.len() >= 3 {
            break;
        }
    }

    let mut suggestions = Vec::with_capacity(names.len() * 2 + 3);
    for name in names {
        suggestions.push(Suggestion {
            label: format!("Reduce {} by 20%", name),
            payload: SuggestionPayload::Message {
                message: format!("Reduce {} by 20%", name),
            },
        });
        suggestions.push(Suggestion {
            label: format!("Exclude {}", name),
            payload: SuggestionPayload::Message {
                message: format!("Exclude {}", name),
            },
        });
    }

    suggestions.push(Suggestion {
        label: "Reduce everything by 5%".to_string(),
        payload: SuggestionPayload::Message {
            message: "Reduce everything by 5%".to_string(),
        },
    });
    suggestions.push(Suggestion {
        label: "Set unit cost to 40,000/person-day".to_string(),
        payload: SuggestionPayload::Intent {
            intent: Intent::UnitCostChange { unit_cost: 40_000.0 },
        },
    });
    suggestions.push(Suggestion {
        label: "Fit within a 1,200,000 budget".to_string(),
        payload: SuggestionPayload::Intent {
            intent: Intent::FitBudget { cap: 1_200_000.0 },
        },
    });

    suggestions
}
