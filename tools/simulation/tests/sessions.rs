//! Session worker behavior against a mock server
//!
//! Runs under paused tokio time so window and interval arithmetic is exact.

mod common;

use common::{Behavior, Fault, MockExchange};
use std::sync::Arc;
use std::time::Duration;
use trader_sim::catalog::SymbolCatalog;
use tokio::time::Instant;
use trader_sim::session::{SessionConfig, SessionTimeouts, SessionWorker};
use trader_sim::transport::Endpoint;
use types::errors::{RegistrationError, SessionError};
use types::ids::TraderId;

fn session(id: &str, duration: Duration, interval: Duration) -> SessionConfig {
    SessionConfig::new(
        TraderId::new(id),
        Endpoint::new("mock", 8888),
        Arc::new(SymbolCatalog::default()),
    )
    .with_duration(duration)
    .with_interval(interval)
    .with_seed(Some(42))
}

#[tokio::test(start_paused = true)]
async fn test_four_second_window_sends_three_orders() {
    let exchange = MockExchange::new(Behavior::Acknowledge);
    let worker = SessionWorker::new(exchange.clone());

    let outcome = worker
        .run(&session("trader1", Duration::from_secs(4), Duration::from_secs(2)))
        .await;

    assert!(outcome.success);
    assert!(outcome.registered);
    assert_eq!(outcome.orders_sent, 3);
    assert_eq!(outcome.orders_skipped, 0);
    assert!(outcome.elapsed >= Duration::from_secs(4));
    assert_eq!(outcome.latency.total(), 3);
    assert!(outcome.failure.is_none());

    let lines = exchange.received();
    assert_eq!(lines[0], "REGISTER:trader1");
    assert_eq!(exchange.count_prefix("ORDER:trader1:"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_order_count_bound() {
    let cases = [
        (Duration::from_secs(5), Duration::from_secs(2)),
        (Duration::from_secs(1), Duration::from_millis(300)),
        (Duration::from_millis(1999), Duration::from_secs(1)),
        (Duration::ZERO, Duration::from_secs(1)),
        (Duration::from_millis(500), Duration::from_secs(3)),
    ];

    for (duration, interval) in cases {
        let exchange = MockExchange::new(Behavior::Acknowledge);
        let worker = SessionWorker::new(exchange);
        let config = session("trader1", duration, interval);
        let bound = config.max_order_cycles();

        let outcome = worker.run(&config).await;
        assert_eq!(
            outcome.orders_sent, bound,
            "duration {:?} interval {:?}",
            duration, interval
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_skips_registration() {
    let exchange = MockExchange::with_fault(Behavior::Acknowledge, Fault::RefuseEvery(1));
    let worker = SessionWorker::new(exchange.clone());

    let outcome = worker
        .run(&session("trader1", Duration::from_secs(4), Duration::from_secs(2)))
        .await;

    assert!(!outcome.success);
    assert!(!outcome.registered);
    assert_eq!(outcome.orders_sent, 0);
    assert!(matches!(outcome.failure, Some(SessionError::Connect { .. })));
    assert_eq!(exchange.attempts(), 1);
    assert!(exchange.received().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_registration_still_trades() {
    let exchange = MockExchange::new(Behavior::Reject);
    let worker = SessionWorker::new(exchange);

    let outcome = worker
        .run(&session("trader7", Duration::from_secs(4), Duration::from_secs(2)))
        .await;

    assert!(outcome.success);
    assert!(!outcome.registered);
    assert_eq!(outcome.orders_sent, 3);
    assert!(matches!(
        outcome.failure,
        Some(SessionError::Registration(RegistrationError::Unrecognized { .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_silent_server_still_trades() {
    let exchange = MockExchange::new(Behavior::Silent);
    let worker = SessionWorker::new(exchange.clone());

    let outcome = worker
        .run(&session("trader2", Duration::from_secs(6), Duration::from_secs(2)))
        .await;

    assert!(outcome.success);
    assert!(!outcome.registered);
    assert_eq!(outcome.orders_sent, 4);
    assert_eq!(
        outcome.failure,
        Some(SessionError::Registration(RegistrationError::Timeout))
    );
    // No replies, so no round trips measured
    assert_eq!(outcome.latency.total(), 0);
    assert_eq!(exchange.count_prefix("ORDER:"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_send_faults_do_not_end_session() {
    let exchange = MockExchange::new(Behavior::HangUpAfterRegister);
    let worker = SessionWorker::new(exchange);
    let config = session("trader3", Duration::from_secs(4), Duration::from_secs(1));

    let outcome = worker.run(&config).await;

    assert!(outcome.success);
    assert!(outcome.registered);
    assert_eq!(outcome.orders_sent, 0);
    // Every scheduled cycle was attempted and skipped
    assert_eq!(outcome.orders_skipped, config.max_order_cycles());
    assert!(outcome.elapsed >= Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_same_seed_same_orders() {
    let first = MockExchange::new(Behavior::Acknowledge);
    let second = MockExchange::new(Behavior::Acknowledge);
    let config = session("trader1", Duration::from_secs(6), Duration::from_secs(1));

    SessionWorker::new(first.clone()).run(&config).await;
    SessionWorker::new(second.clone()).run(&config).await;

    assert_eq!(first.received(), second.received());
    assert_eq!(first.count_prefix("ORDER:"), 7);
}

#[tokio::test(start_paused = true)]
async fn test_no_send_after_window_closes() {
    // Each drain outlasts the interval, so wakeups land after their slots
    let exchange = MockExchange::new(Behavior::Silent);
    let worker = SessionWorker::new(exchange.clone());
    let timeouts = SessionTimeouts {
        register_ack: Duration::from_secs(1),
        drain: Duration::from_millis(1500),
        ..SessionTimeouts::default()
    };
    let config = session("trader5", Duration::from_secs(2), Duration::from_secs(1)).with_timeouts(timeouts);

    let started = Instant::now();
    let outcome = worker.run(&config).await;

    // Trading opens once the silent registration times out
    let window_end = started + timeouts.register_ack + config.duration;
    let orders: Vec<_> = exchange
        .received_at()
        .into_iter()
        .filter(|(_, line)| line.starts_with("ORDER:"))
        .collect();

    assert!(outcome.success);
    assert_eq!(orders.len() as u64, outcome.orders_sent);
    assert_eq!(outcome.orders_sent, 2);
    assert!(orders.iter().all(|(at, _)| *at <= window_end));
}
