//! Integration tests for the protection pipeline: retry, circuit breaker,
//! and the engines' fallback behavior under persistent failure.

mod common;

use common::{fast_retry, protected_client_with, ScriptedTransport, Step};
use sekisan::config::LlmConfig;
use sekisan::control::breaker::{BreakerRegistry, BreakerState, CircuitBreaker};
use sekisan::control::pipeline::CallError;
use sekisan::control::retry::RetryPolicy;
use sekisan::estimate::{Deliverable, EstimationEngine, FallbackTable};
use sekisan::question::QuestionEngine;
use sekisan::transport::CompletionRequest;
use std::sync::Arc;
use std::time::Duration;

fn request() -> CompletionRequest {
    CompletionRequest {
        system_prompt: "system".to_string(),
        user_prompt: "user".to_string(),
        model: "gpt-4o-mini".to_string(),
        max_tokens: 100,
        temperature: 0.3,
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn retry_exhaustion_trips_breaker_after_enough_calls() {
    let transport = Arc::new(ScriptedTransport::always_failing());
    let breakers = Arc::new(BreakerRegistry::new(3, Duration::from_secs(60)));
    let client = protected_client_with(transport.clone(), breakers.clone(), fast_retry(2));

    // Three protected calls, each exhausting 2 retry attempts.
    for _ in 0..3 {
        let result = client.call("estimate", request()).await;
        assert!(matches!(result, Err(CallError::Transport(_))));
    }
    assert_eq!(transport.calls(), 6);
    assert_eq!(breakers.get("llm_estimate").state(), BreakerState::Open);

    // The next call is rejected without touching the transport.
    let result = client.call("estimate", request()).await;
    assert!(matches!(result, Err(CallError::Unavailable { .. })));
    assert_eq!(transport.calls(), 6);
}

#[tokio::test]
async fn breaker_recovers_through_half_open_trial() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::Fail("outage".to_string()),
        Step::Fail("outage".to_string()),
        Step::Text("{\"person_days\": 1.0}".to_string()),
    ]));
    // Breaker opens after 2 failures, half-open after 100ms.
    let breakers = Arc::new(BreakerRegistry::new(2, Duration::from_millis(100)));
    let client = protected_client_with(transport.clone(), breakers.clone(), fast_retry(1));

    for _ in 0..2 {
        let _ = client.call("estimate", request()).await;
    }
    assert_eq!(breakers.get("llm_estimate").state(), BreakerState::Open);

    tokio::time::sleep(Duration::from_millis(150)).await;

    // Half-open trial succeeds and closes the circuit.
    let result = client.call("estimate", request()).await;
    assert!(result.is_ok());
    assert_eq!(breakers.get("llm_estimate").state(), BreakerState::Closed);
}

#[tokio::test]
async fn breakers_are_independent_per_operation() {
    let transport = Arc::new(ScriptedTransport::always_failing());
    let breakers = Arc::new(BreakerRegistry::new(1, Duration::from_secs(60)));
    let client = protected_client_with(transport, breakers.clone(), fast_retry(1));

    let _ = client.call("estimate", request()).await;
    assert_eq!(breakers.get("llm_estimate").state(), BreakerState::Open);
    assert_eq!(breakers.get("llm_question").state(), BreakerState::Closed);
}

#[tokio::test]
async fn manual_reset_restores_service() {
    let cb = CircuitBreaker::new("llm_estimate", 1, Duration::from_secs(600));
    let _ = cb
        .call(|| async { Err::<(), &str>("boom") })
        .await;
    assert_eq!(cb.state(), BreakerState::Open);

    cb.reset();
    assert_eq!(cb.state(), BreakerState::Closed);
    let result = cb.call(|| async { Ok::<_, &str>("ok") }).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn estimation_falls_back_to_keyword_heuristic() {
    let transport = Arc::new(ScriptedTransport::always_failing());
    let client = protected_client_with(
        transport,
        Arc::new(BreakerRegistry::new(100, Duration::from_secs(60))),
        fast_retry(2),
    );
    let engine = EstimationEngine::new(
        client,
        common::llm_config(),
        common::jpy_pricing(),
        FallbackTable::default(),
        5,
    );

    let deliverables = vec![Deliverable::new(0, "要件定義書", "")];
    let estimates = engine
        .generate_estimates(&deliverables, "Test system", &[])
        .await
        .unwrap();

    assert_eq!(estimates.len(), 1);
    assert_eq!(estimates[0].person_days, 10.0);
    assert_eq!(estimates[0].amount, 10.0 * 40_000.0);
    assert!(!estimates[0].reasoning_notes.is_empty());
}

#[tokio::test]
async fn estimation_recovers_on_second_attempt() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::Fail("blip".to_string()),
        Step::Text(r#"{"person_days": 5.0, "reasoning_breakdown": "- work: 5.0"}"#.to_string()),
    ]));
    let client = protected_client_with(
        transport.clone(),
        Arc::new(BreakerRegistry::new(100, Duration::from_secs(60))),
        fast_retry(3),
    );
    let engine = EstimationEngine::new(
        client,
        common::llm_config(),
        common::jpy_pricing(),
        FallbackTable::default(),
        5,
    );

    let estimates = engine
        .generate_estimates(&[Deliverable::new(0, "基本設計書", "")], "sys", &[])
        .await
        .unwrap();

    assert_eq!(estimates[0].person_days, 5.0);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn question_engine_degrades_to_defaults() {
    let transport = Arc::new(ScriptedTransport::always_failing());
    let client = protected_client_with(
        transport,
        Arc::new(BreakerRegistry::new(100, Duration::from_secs(60))),
        fast_retry(2),
    );
    let engine = QuestionEngine::new(client, LlmConfig::default());

    let questions = engine
        .generate_questions(&[Deliverable::new(0, "要件定義書", "")], "sys")
        .await
        .unwrap();

    assert_eq!(questions.len(), 3);
    for q in &questions {
        assert!(!q.is_empty());
    }
}

#[tokio::test]
async fn hung_transport_is_timed_out() {
    use async_trait::async_trait;
    use sekisan::control::budget::CostTracker;
    use sekisan::control::pipeline::ProtectedClient;
    use sekisan::transport::{Completion, ModelTransport, TokenUsage, TransportError};

    struct HangingTransport;

    #[async_trait]
    impl ModelTransport for HangingTransport {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<Completion, TransportError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Completion {
                text: String::new(),
                usage: TokenUsage::default(),
            })
        }
    }

    let client = ProtectedClient::new(
        Arc::new(HangingTransport),
        Arc::new(BreakerRegistry::new(100, Duration::from_secs(60))),
        RetryPolicy::new(1, Duration::from_millis(1), 2.0),
        Arc::new(CostTracker::new(0.15, 0.60, 10.0, 200.0)),
    );

    let mut request = request();
    request.timeout = Duration::from_millis(50);

    let result = client.call("estimate", request).await;
    match result {
        Err(CallError::Transport(TransportError::Timeout(ms))) => assert_eq!(ms, 50),
        other => panic!("expected timeout, got {:?}", other.map(|c| c.text)),
    }
}
