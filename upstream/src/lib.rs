//! Client for the slow, unreliable upstream capability.
//!
//! # Architecture
//!
//! - [`Upstream`] - The capability one attempt calls. The aggregation engine is generic
//!   over it, so tests substitute scripted in-memory implementations.
//! - [`HttpUpstream`] - The production implementation: a `GET` against the configured
//!   URL returning a `{"Time": <ms>}` payload.
//!
//! # Error Handling
//!
//! Every way a call can go wrong is normalized into [`UpstreamError`]. Callers never
//! need to inspect transport details to decide what happened: an `Ok` is a value, an
//! `Err` is a failed attempt. Cancellation is not an error; it is expressed by dropping
//! the future returned from [`Upstream::call`].

mod http;

use std::future::Future;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use thiserror::Error;

pub use http::{HttpUpstream, SleepResponse};
pub use reqwest::{StatusCode, Url};

/// Default sleep endpoint of a locally running upstream.
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8080/api/sleep";

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

const TCP_KEEPALIVE_SECS: u64 = 60;

// Every request fans out to at most three concurrent calls; keep enough idle
// connections around that back-to-back requests reuse them.
const POOL_MAX_IDLE_PER_HOST: usize = 32;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Largest payload accepted from the upstream. The expected body is a tiny JSON object.
pub(crate) const MAX_PAYLOAD_BYTES: usize = 4 * 1024;

/// One external call whose latency is unbounded and which may fail.
///
/// Implementations must be cancel-safe: dropping the returned future before it
/// resolves abandons the call without side effects.
pub trait Upstream: Send + Sync + 'static {
    fn call(&self) -> impl Future<Output = Result<i64, UpstreamError>> + Send;
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("the upstream returned an error: {0}")]
    Status(StatusCode),
    #[error("malformed upstream payload: {0}")]
    Payload(#[source] serde_json::Error),
    #[error("upstream payload too large ({bytes} bytes)")]
    PayloadTooLarge { bytes: usize },
}

/// Connection settings for [`HttpUpstream`].
#[derive(Debug, Clone)]
pub struct UpstreamOptions {
    pub url: Url,
    pub connect_timeout: Duration,
    /// Forwarded as the `min` query parameter when set.
    pub min_ms: Option<u64>,
    /// Forwarded as the `max` query parameter when set.
    pub max_ms: Option<u64>,
}

impl UpstreamOptions {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            min_ms: None,
            max_ms: None,
        }
    }

    /// Target URL with the latency knobs applied as query parameters.
    #[must_use]
    pub fn request_url(&self) -> Url {
        let mut url = self.url.clone();
        if self.min_ms.is_some() || self.max_ms.is_some() {
            let mut pairs = url.query_pairs_mut();
            if let Some(min) = self.min_ms {
                pairs.append_pair("min", &min.to_string());
            }
            if let Some(max) = self.max_ms {
                pairs.append_pair("max", &max.to_string());
            }
        }
        url
    }
}

fn base_client_builder(options: &UpstreamOptions) -> ClientBuilder {
    Client::builder()
        .connect_timeout(options.connect_timeout)
        .redirect(Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .user_agent(concat!("fanout/", env!("CARGO_PKG_VERSION")))
}
