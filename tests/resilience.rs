//! Policy-chain behavior: retry schedules, breaker lifecycle, cancellation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use ragweave::CancelToken;
use ragweave::providers::ProviderError;
use ragweave::resilience::{BreakerConfig, CircuitStatus, ResilienceError, RetryConfig};

use common::*;

fn no_jitter_retry(max_attempts: u32, base_delay: Duration) -> RetryConfig {
    RetryConfig {
        max_attempts,
        base_delay,
        jitter_bound: Duration::ZERO,
    }
}

#[tokio::test(start_paused = true)]
async fn two_transient_failures_then_success_invokes_provider_three_times() {
    init_tracing();
    let provider = Arc::new(FlakyEmbedder::new(
        32,
        vec![
            ProviderError::RateLimited("429".into()),
            ProviderError::Unavailable("503".into()),
        ],
    ));
    let embedder = guarded_embedder(
        provider.clone(),
        BreakerConfig::default(),
        no_jitter_retry(3, Duration::from_secs(1)),
    );
    let cancel = CancelToken::new();

    embedder.embed("hello", &cancel).await.unwrap();
    assert_eq!(provider.calls(), 3);

    // Backoff gaps double between attempts: 1s then 2s.
    let times = provider.call_times();
    let first_gap = times[1] - times[0];
    let second_gap = times[2] - times[1];
    assert_eq!(first_gap, Duration::from_secs(1));
    assert_eq!(second_gap, Duration::from_secs(2));
    assert!(second_gap > first_gap);
}

#[tokio::test]
async fn non_transient_failures_are_not_retried() {
    let provider = Arc::new(FlakyEmbedder::new(
        32,
        vec![ProviderError::Malformed("no data returned".into())],
    ));
    let embedder = guarded_embedder(
        provider.clone(),
        BreakerConfig::default(),
        no_jitter_retry(3, Duration::from_millis(10)),
    );
    let cancel = CancelToken::new();

    let err = embedder.embed("hello", &cancel).await.unwrap_err();
    assert!(matches!(
        err,
        ResilienceError::Provider(ProviderError::Malformed(_))
    ));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_last_transient_error() {
    let provider = Arc::new(FlakyEmbedder::new(
        32,
        vec![
            ProviderError::RateLimited("1".into()),
            ProviderError::RateLimited("2".into()),
            ProviderError::Unavailable("3".into()),
        ],
    ));
    let embedder = guarded_embedder(
        provider.clone(),
        BreakerConfig::default(),
        no_jitter_retry(3, Duration::from_secs(1)),
    );
    let cancel = CancelToken::new();

    let err = embedder.embed("hello", &cancel).await.unwrap_err();
    match err {
        ResilienceError::TransientExhausted { attempts, source } => {
            assert_eq!(attempts, 3);
            assert!(matches!(source, ProviderError::Unavailable(_)));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(provider.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn breaker_opens_after_threshold_and_recovers_through_a_probe() {
    init_tracing();
    // Five failing calls trip the circuit, the sixth is rejected unseen by
    // the provider, and after the cooldown a successful probe closes it.
    let provider = Arc::new(FlakyEmbedder::new(
        32,
        vec![ProviderError::Unavailable("down".into()); 5],
    ));
    let breaker = BreakerConfig {
        failure_threshold: 5,
        cooldown: Duration::from_secs(30),
    };
    let embedder = guarded_embedder(provider.clone(), breaker, no_jitter_retry(1, Duration::ZERO));
    let cancel = CancelToken::new();

    for _ in 0..5 {
        let err = embedder.embed("hello", &cancel).await.unwrap_err();
        assert!(matches!(err, ResilienceError::TransientExhausted { .. }));
    }
    assert_eq!(provider.calls(), 5);
    assert_eq!(embedder.circuit_status(), CircuitStatus::Open);

    let err = embedder.embed("hello", &cancel).await.unwrap_err();
    assert!(matches!(err, ResilienceError::CircuitOpen));
    assert_eq!(provider.calls(), 5);

    tokio::time::advance(Duration::from_secs(30)).await;
    embedder.embed("hello", &cancel).await.unwrap();
    assert_eq!(embedder.circuit_status(), CircuitStatus::Closed);

    // Closed again: calls flow to the provider normally.
    embedder.embed("hello", &cancel).await.unwrap();
    assert_eq!(provider.calls(), 7);
}

#[tokio::test(start_paused = true)]
async fn failed_probe_reopens_and_restarts_the_cooldown() {
    let provider = Arc::new(FlakyEmbedder::new(
        32,
        vec![ProviderError::Unavailable("down".into()); 2],
    ));
    let breaker = BreakerConfig {
        failure_threshold: 1,
        cooldown: Duration::from_secs(10),
    };
    let embedder = guarded_embedder(provider.clone(), breaker, no_jitter_retry(1, Duration::ZERO));
    let cancel = CancelToken::new();

    embedder.embed("hello", &cancel).await.unwrap_err();
    assert_eq!(embedder.circuit_status(), CircuitStatus::Open);

    tokio::time::advance(Duration::from_secs(10)).await;
    // The probe fails and re-opens the circuit.
    embedder.embed("hello", &cancel).await.unwrap_err();
    assert_eq!(embedder.circuit_status(), CircuitStatus::Open);
    assert_eq!(provider.calls(), 2);

    // Still cooling down: rejected without a provider call.
    tokio::time::advance(Duration::from_secs(9)).await;
    let err = embedder.embed("hello", &cancel).await.unwrap_err();
    assert!(matches!(err, ResilienceError::CircuitOpen));
    assert_eq!(provider.calls(), 2);

    tokio::time::advance(Duration::from_secs(1)).await;
    embedder.embed("hello", &cancel).await.unwrap();
    assert_eq!(embedder.circuit_status(), CircuitStatus::Closed);
}

#[tokio::test]
async fn cancellation_during_backoff_stops_retrying() {
    let provider = Arc::new(FlakyEmbedder::new(
        32,
        vec![ProviderError::RateLimited("throttled".into()); 10],
    ));
    let embedder = guarded_embedder(
        provider.clone(),
        BreakerConfig::default(),
        no_jitter_retry(3, Duration::from_millis(200)),
    );

    let cancel = CancelToken::new();
    let task = {
        let embedder = embedder.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { embedder.embed("hello", &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, ResilienceError::Cancelled));
    assert_eq!(provider.calls(), 1);
}
