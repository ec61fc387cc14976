//! Token-cost ledger with daily/monthly budget enforcement.

use crate::transport::TokenUsage;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::sync::Mutex;
use thiserror::Error;

/// Budget errors surfaced to the caller.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Monthly hard limit breached. The triggering call must be aborted and
    /// the error surfaced to the user.
    #[error("Monthly cost limit exceeded: ${spent:.2} of ${limit:.2}")]
    MonthlyLimitExceeded { spent: f64, limit: f64 },
}

/// Read-only view of the ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostSnapshot {
    pub daily_cost: f64,
    pub monthly_cost: f64,
    pub daily_limit: f64,
    pub monthly_limit: f64,
}

#[derive(Debug)]
struct Ledger {
    daily_cost: f64,
    monthly_cost: f64,
    last_reset_date: NaiveDate,
    last_reset_month: u32,
}

/// Process-wide cost tracker.
///
/// Accumulates per-call token cost against daily and monthly budgets.
/// Counters zero lazily when the wall-clock date or month advances; there is
/// no scheduled reset job. Constructed once at startup and shared by handle.
pub struct CostTracker {
    price_per_1m_input: f64,
    price_per_1m_output: f64,
    daily_limit: f64,
    monthly_limit: f64,
    ledger: Mutex<Ledger>,
}

impl CostTracker {
    pub fn new(
        price_per_1m_input: f64,
        price_per_1m_output: f64,
        daily_limit: f64,
        monthly_limit: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            price_per_1m_input,
            price_per_1m_output,
            daily_limit,
            monthly_limit,
            ledger: Mutex::new(Ledger {
                daily_cost: 0.0,
                monthly_cost: 0.0,
                last_reset_date: now.date_naive(),
                last_reset_month: now.month(),
            }),
        }
    }

    /// Cost of one call in USD.
    pub fn cost_of(&self, usage: TokenUsage) -> f64 {
        (usage.input_tokens as f64 / 1_000_000.0) * self.price_per_1m_input
            + (usage.output_tokens as f64 / 1_000_000.0) * self.price_per_1m_output
    }

    /// Record a completed call (successful or failed).
    ///
    /// Failed calls report zero tokens and contribute zero cost. Returns the
    /// cost of this call, or `BudgetError::MonthlyLimitExceeded` once the
    /// monthly total crosses the hard limit. Crossing 80% of the daily limit
    /// only logs a warning.
    pub fn record(&self, usage: TokenUsage) -> Result<f64, BudgetError> {
        self.record_at(Utc::now(), usage)
    }

    fn record_at(&self, now: DateTime<Utc>, usage: TokenUsage) -> Result<f64, BudgetError> {
        let cost = self.cost_of(usage);
        let mut ledger = self.ledger.lock().expect("cost ledger lock poisoned");

        // Lazy rollover before adding.
        let today = now.date_naive();
        if today != ledger.last_reset_date {
            ledger.daily_cost = 0.0;
            ledger.last_reset_date = today;
        }
        if now.month() != ledger.last_reset_month {
            ledger.monthly_cost = 0.0;
            ledger.last_reset_month = now.month();
        }

        ledger.daily_cost += cost;
        ledger.monthly_cost += cost;

        crate::metrics::record_cost(cost, ledger.daily_cost, ledger.monthly_cost);

        if ledger.monthly_cost > self.monthly_limit {
            tracing::error!(
                monthly_cost_usd = ledger.monthly_cost,
                limit_usd = self.monthly_limit,
                "Monthly cost limit exceeded"
            );
            return Err(BudgetError::MonthlyLimitExceeded {
                spent: ledger.monthly_cost,
                limit: self.monthly_limit,
            });
        }

        if ledger.daily_cost > self.daily_limit * 0.8 {
            tracing::warn!(
                daily_cost_usd = ledger.daily_cost,
                limit_usd = self.daily_limit,
                usage_percent = (ledger.daily_cost / self.daily_limit) * 100.0,
                "Daily cost approaching limit (80%)"
            );
        }

        Ok(cost)
    }

    /// Current ledger totals.
    pub fn snapshot(&self) -> CostSnapshot {
        let ledger = self.ledger.lock().expect("cost ledger lock poisoned");
        CostSnapshot {
            daily_cost: ledger.daily_cost,
            monthly_cost: ledger.monthly_cost,
            daily_limit: self.daily_limit,
            monthly_limit: self.monthly_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tracker() -> CostTracker {
        // gpt-4o-mini prices, $10 daily, $200 monthly.
        CostTracker::new(0.15, 0.60, 10.0, 200.0)
    }

    #[test]
    fn test_cost_calculation() {
        let t = tracker();
        let cost = t.cost_of(TokenUsage {
            input_tokens: 1000,
            output_tokens: 500,
        });
        assert!((cost - 0.00045).abs() < 1e-9);
    }

    #[test]
    fn test_failed_call_contributes_zero() {
        let t = tracker();
        let cost = t.record(TokenUsage::default()).unwrap();
        assert_eq!(cost, 0.0);
        assert_eq!(t.snapshot().daily_cost, 0.0);
    }

    #[test]
    fn test_totals_accumulate() {
        let t = tracker();
        let usage = TokenUsage {
            input_tokens: 1000,
            output_tokens: 500,
        };
        t.record(usage).unwrap();
        t.record(usage).unwrap();

        let snap = t.snapshot();
        assert!((snap.daily_cost - 0.0009).abs() < 1e-9);
        assert!((snap.monthly_cost - 0.0009).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_limit_is_fatal() {
        let t = CostTracker::new(0.15, 0.60, 10.0, 0.0004);
        let usage = TokenUsage {
            input_tokens: 1000,
            output_tokens: 500,
        };
        let result = t.record(usage);
        assert!(matches!(
            result,
            Err(BudgetError::MonthlyLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_daily_counter_resets_on_date_rollover() {
        let t = tracker();
        let usage = TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 0,
        };

        let day1 = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2026, 3, 11, 0, 5, 0).unwrap();

        t.record_at(day1, usage).unwrap();
        assert!((t.snapshot().daily_cost - 0.15).abs() < 1e-9);

        t.record_at(day2, usage).unwrap();
        let snap = t.snapshot();
        // Daily counter zeroed on rollover, monthly kept.
        assert!((snap.daily_cost - 0.15).abs() < 1e-9);
        assert!((snap.monthly_cost - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_counter_resets_on_month_rollover() {
        let t = tracker();
        let usage = TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 0,
        };

        let march = Utc.with_ymd_and_hms(2026, 3, 31, 23, 0, 0).unwrap();
        let april = Utc.with_ymd_and_hms(2026, 4, 1, 1, 0, 0).unwrap();

        t.record_at(march, usage).unwrap();
        t.record_at(april, usage).unwrap();

        let snap = t.snapshot();
        assert!((snap.monthly_cost - 0.15).abs() < 1e-9);
    }
}
