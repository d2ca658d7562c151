//! Cancellation: shutdown hook and dropped requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fanout_engine::{AggregateError, Aggregator, HttpUpstream, PolicyKind};
use tokio::time::{sleep, timeout};

use crate::common::{aggregator, ok, start_sleep_mock};

async fn wait_until_idle(aggregator: &Aggregator<HttpUpstream>) {
    let started = Instant::now();
    while aggregator.in_flight() > 0 {
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "attempts still running: {}",
            aggregator.in_flight()
        );
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn shutdown_ends_open_requests_early() {
    let server = start_sleep_mock(&[ok(3000)]).await;
    let aggregator = Arc::new(aggregator(&server));

    let request = tokio::spawn({
        let aggregator = Arc::clone(&aggregator);
        async move {
            aggregator
                .aggregate_millis(PolicyKind::WaitForAll, 5000)
                .await
        }
    });

    sleep(Duration::from_millis(100)).await;
    let started = Instant::now();
    aggregator.shutdown().await;
    let result = request.await.unwrap();

    assert_eq!(
        result,
        Err(AggregateError::DeadlineExceeded { timeout_ms: 5000 })
    );
    assert!(started.elapsed() < Duration::from_millis(1000));
    assert_eq!(aggregator.in_flight(), 0);
}

#[tokio::test]
async fn collect_interrupted_by_shutdown_keeps_arrivals() {
    let server = start_sleep_mock(&[ok(30), ok(3000)]).await;
    let aggregator = Arc::new(aggregator(&server));

    let request = tokio::spawn({
        let aggregator = Arc::clone(&aggregator);
        async move {
            aggregator
                .aggregate_millis(PolicyKind::CollectWithinDeadline, 5000)
                .await
        }
    });

    sleep(Duration::from_millis(300)).await;
    aggregator.shutdown().await;

    assert_eq!(request.await.unwrap(), Ok(vec![30]));
}

#[tokio::test]
async fn dropping_a_request_cancels_its_attempts() {
    let server = start_sleep_mock(&[ok(3000)]).await;
    let aggregator = aggregator(&server);

    let outcome = timeout(
        Duration::from_millis(100),
        aggregator.aggregate_millis(PolicyKind::WaitForAll, 5000),
    )
    .await;
    assert!(outcome.is_err());

    wait_until_idle(&aggregator).await;
}

#[tokio::test]
async fn late_attempts_wind_down_after_first_success() {
    let server = start_sleep_mock(&[ok(20), ok(3000)]).await;
    let aggregator = aggregator(&server);

    let values = aggregator
        .aggregate_millis(PolicyKind::FirstSuccess, 5000)
        .await
        .unwrap();

    assert_eq!(values, vec![20]);
    wait_until_idle(&aggregator).await;
}
