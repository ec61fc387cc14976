//! Business-rule validation for estimates.
//!
//! Optional collaborator checks; the engines never hard-fail on these, the
//! embedding layer decides where to enforce them.

use thiserror::Error;

/// Amount may deviate from `person_days * unit_cost` by at most this much.
const AMOUNT_TOLERANCE: f64 = 0.10;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Deliverable name must be 3-200 characters, got {0}")]
    NameLength(usize),

    #[error("Person-days must be within 0.5-100, got {0}")]
    PersonDaysRange(f64),

    #[error("Amount {amount} deviates {deviation_percent:.1}% from person_days * unit_cost")]
    AmountMismatch {
        amount: f64,
        deviation_percent: f64,
    },
}

/// Deliverable names must be 3-200 characters after trimming.
pub fn validate_deliverable_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    let len = name.chars().count();
    if !(3..=200).contains(&len) {
        return Err(ValidationError::NameLength(len));
    }
    Ok(name)
}

/// Person-days must fall within [0.5, 100].
pub fn validate_person_days(days: f64) -> Result<f64, ValidationError> {
    if !(0.5..=100.0).contains(&days) {
        return Err(ValidationError::PersonDaysRange(days));
    }
    Ok(days)
}

/// Amount must be within ±10% of `person_days * unit_cost`.
pub fn validate_amount(
    amount: f64,
    person_days: f64,
    unit_cost: f64,
) -> Result<f64, ValidationError> {
    let expected = person_days * unit_cost;
    if expected > 0.0 {
        let deviation = (amount - expected).abs() / expected;
        if deviation > AMOUNT_TOLERANCE {
            return Err(ValidationError::AmountMismatch {
                amount,
                deviation_percent: deviation * 100.0,
            });
        }
    }
    Ok(amount)
}
