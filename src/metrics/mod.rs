//! # Metrics Collection Module
//!
//! Thin helpers over the `metrics` facade. The crate only records; binding an
//! exporter (Prometheus, statsd, ...) is the embedding process's choice.
//!
//! **Counters:**
//! - `sekisan_model_calls_total{operation, outcome}` - Protected model calls
//! - `sekisan_fallbacks_total{operation}` - Heuristic fallbacks taken
//! - `sekisan_breaker_open_total{breaker}` - Circuit breaker trips
//! - `sekisan_rate_limit_rejects_total` - Rejected inbound requests
//!
//! **Gauges:**
//! - `sekisan_cost_daily_usd` / `sekisan_cost_monthly_usd` - Ledger totals

/// Record one protected model call.
pub fn record_model_call(operation: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "sekisan_model_calls_total",
        "operation" => operation.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
}

/// Record a fallback to the keyword heuristic or static defaults.
pub fn record_fallback(operation: &str) {
    metrics::counter!(
        "sekisan_fallbacks_total",
        "operation" => operation.to_string(),
    )
    .increment(1);
}

/// Record a circuit breaker trip.
pub fn record_breaker_open(breaker: &str) {
    metrics::counter!(
        "sekisan_breaker_open_total",
        "breaker" => breaker.to_string(),
    )
    .increment(1);
}

/// Record a rate-limited inbound request.
pub fn record_rate_limit_reject() {
    metrics::counter!("sekisan_rate_limit_rejects_total").increment(1);
}

/// Update ledger gauges after a cost record.
pub fn record_cost(call_cost: f64, daily_total: f64, monthly_total: f64) {
    let _ = call_cost;
    metrics::gauge!("sekisan_cost_daily_usd").set(daily_total);
    metrics::gauge!("sekisan_cost_monthly_usd").set(monthly_total);
}
