//! Shared test utilities and fixtures
//!
//! A scripted sleep endpoint served by wiremock. Each request takes the next
//! step of the script; once the script runs out the last step repeats.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fanout_engine::{Aggregator, HttpUpstream, UpstreamOptions};
use fanout_upstream::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const SLEEP_PATH: &str = "/api/sleep";

#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub delay_ms: u64,
    pub status: u16,
}

/// Responds `200 {"Time": delay}` after `delay_ms`.
pub const fn ok(delay_ms: u64) -> Step {
    Step {
        delay_ms,
        status: 200,
    }
}

/// Responds `500` after `delay_ms`.
pub const fn fail(delay_ms: u64) -> Step {
    Step {
        delay_ms,
        status: 500,
    }
}

struct Script {
    steps: Vec<Step>,
    served: AtomicUsize,
}

impl Respond for Script {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.served.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .get(n)
            .or_else(|| self.steps.last())
            .copied()
            .unwrap_or(ok(0));

        let template = if step.status == 200 {
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "Time": step.delay_ms }))
        } else {
            ResponseTemplate::new(step.status)
        };
        template.set_delay(Duration::from_millis(step.delay_ms))
    }
}

/// Start a mock upstream that plays `steps` in request-arrival order.
pub async fn start_sleep_mock(steps: &[Step]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SLEEP_PATH))
        .respond_with(Script {
            steps: steps.to_vec(),
            served: AtomicUsize::new(0),
        })
        .mount(&server)
        .await;
    server
}

pub fn sleep_url(server: &MockServer) -> String {
    format!("{}{SLEEP_PATH}", server.uri())
}

pub fn http_upstream(server: &MockServer) -> HttpUpstream {
    let url = Url::parse(&sleep_url(server)).unwrap();
    HttpUpstream::new(&UpstreamOptions::new(url)).unwrap()
}

pub fn aggregator(server: &MockServer) -> Aggregator<HttpUpstream> {
    Aggregator::new(http_upstream(server))
}

/// Requests the mock has seen so far.
pub async fn received(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map_or(0, |requests| requests.len())
}

pub fn sorted(mut values: Vec<i64>) -> Vec<i64> {
    values.sort_unstable();
    values
}
