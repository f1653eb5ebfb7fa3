//! Scripted single-trader submission against the mock server

mod common;

use common::{Behavior, Fault, MockExchange};
use trader_sim::script::{default_script, run_script, ScriptTiming};
use trader_sim::transport::Endpoint;
use types::errors::SessionError;
use types::ids::TraderId;

#[tokio::test(start_paused = true)]
async fn test_default_script_transcript() {
    let exchange = MockExchange::new(Behavior::Acknowledge);
    let trader = TraderId::new("trader1");

    let transcript = run_script(
        &*exchange,
        &Endpoint::new("mock", 8888),
        &trader,
        &default_script(),
        ScriptTiming::default(),
    )
    .await
    .unwrap();

    assert_eq!(transcript.registration.command, "REGISTER:trader1\n");
    assert!(transcript
        .registration
        .response
        .as_deref()
        .unwrap()
        .contains("REGISTERED"));

    assert_eq!(transcript.orders.len(), 3);
    assert_eq!(
        transcript.orders[0].command,
        "ORDER:trader1:AAPL:BUY:LIMIT:150.50:10\n"
    );
    assert_eq!(
        transcript.orders[1].command,
        "ORDER:trader1:AAPL:SELL:LIMIT:151.00:5\n"
    );
    assert_eq!(
        transcript.orders[2].command,
        "ORDER:trader1:GOOGL:BUY:LIMIT:2800.00:2\n"
    );
    assert!(transcript
        .orders
        .iter()
        .all(|o| o.response.as_deref().is_some_and(|r| r.starts_with("ORDER_ACCEPTED"))));
    assert!(transcript.notifications.is_empty());

    assert_eq!(exchange.count_prefix("ORDER:trader1:"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_silent_server_leaves_responses_empty() {
    let exchange = MockExchange::new(Behavior::Silent);

    let transcript = run_script(
        &*exchange,
        &Endpoint::new("mock", 8888),
        &TraderId::new("trader2"),
        &default_script(),
        ScriptTiming::default(),
    )
    .await
    .unwrap();

    assert!(transcript.registration.response.is_none());
    assert!(transcript.orders.iter().all(|o| o.response.is_none()));
    assert_eq!(exchange.count_prefix("ORDER:"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_refused_connect_is_an_error() {
    let exchange = MockExchange::with_fault(Behavior::Acknowledge, Fault::RefuseEvery(1));

    let result = run_script(
        &*exchange,
        &Endpoint::new("mock", 8888),
        &TraderId::new("trader1"),
        &default_script(),
        ScriptTiming::default(),
    )
    .await;

    assert!(matches!(result, Err(SessionError::Connect { .. })));
}
