//! Integration tests for the standalone protection services: cost tracker,
//! rate limiter, loop guards.

use sekisan::control::budget::{BudgetError, CostTracker};
use sekisan::control::loop_guard::LoopGuardRegistry;
use sekisan::control::rate_limit::{RateLimitError, RateLimiter};
use sekisan::transport::TokenUsage;
use std::time::Duration;

#[test]
fn cost_tracker_records_gpt4o_mini_prices() {
    let tracker = CostTracker::new(0.15, 0.60, 10.0, 200.0);

    let cost = tracker
        .record(TokenUsage {
            input_tokens: 1000,
            output_tokens: 500,
        })
        .unwrap();
    assert!((cost - 0.00045).abs() < 1e-9);

    // A failed call with zero tokens contributes nothing.
    let cost = tracker.record(TokenUsage::default()).unwrap();
    assert_eq!(cost, 0.0);

    let snapshot = tracker.snapshot();
    assert!((snapshot.daily_cost - 0.00045).abs() < 1e-9);
    assert!((snapshot.monthly_cost - 0.00045).abs() < 1e-9);
}

#[test]
fn monthly_ceiling_surfaces_a_budget_error() {
    let tracker = CostTracker::new(0.15, 0.60, 10.0, 0.001);

    // Each call costs $0.00045; the third crosses the $0.001 ceiling.
    let usage = TokenUsage {
        input_tokens: 1000,
        output_tokens: 500,
    };
    assert!(tracker.record(usage).is_ok());
    assert!(tracker.record(usage).is_ok());
    let result = tracker.record(usage);
    assert!(matches!(
        result,
        Err(BudgetError::MonthlyLimitExceeded { .. })
    ));
}

#[test]
fn rate_limiter_enforces_sliding_window() {
    let limiter = RateLimiter::new(3, Duration::from_secs(60));

    for _ in 0..3 {
        assert!(limiter.check("192.0.2.1").is_ok());
    }

    match limiter.check("192.0.2.1") {
        Err(RateLimitError::Exceeded {
            client_id,
            retry_after,
        }) => {
            assert_eq!(client_id, "192.0.2.1");
            assert!(retry_after > Duration::ZERO);
            assert!(retry_after <= Duration::from_secs(60));
        }
        Ok(()) => panic!("4th request must be rejected"),
    }

    // Another client is unaffected.
    assert!(limiter.check("192.0.2.2").is_ok());
    assert_eq!(limiter.get_remaining("192.0.2.1"), 0);
    assert_eq!(limiter.get_remaining("192.0.2.2"), 2);

    // Admin reset restores the allowance.
    limiter.reset_client("192.0.2.1");
    assert!(limiter.check("192.0.2.1").is_ok());
}

#[test]
fn loop_guards_are_scoped_per_task() {
    let registry = LoopGuardRegistry::new(3);

    let a = registry.get("task-a");
    let b = registry.get("task-b");

    for _ in 0..3 {
        a.check("estimate_items").unwrap();
    }
    assert!(a.check("estimate_items").is_err());
    // task-b has its own counter.
    assert!(b.check("estimate_items").is_ok());

    // Cleanup makes room for a fresh guard.
    registry.remove("task-a");
    assert!(registry.get("task-a").check("estimate_items").is_ok());
}
