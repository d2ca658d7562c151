//! `GET`-based upstream backed by a pooled `reqwest` client.

use std::future::Future;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::{MAX_PAYLOAD_BYTES, Upstream, UpstreamError, UpstreamOptions, base_client_builder};

/// Payload returned by the upstream: how long it slept, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SleepResponse {
    #[serde(rename = "Time")]
    pub time: i64,
}

/// Production [`Upstream`]: one HTTP `GET` per call.
///
/// The client is built once and shared by every attempt of every request, so
/// concurrent attempts reuse pooled connections.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    url: Url,
}

impl HttpUpstream {
    pub fn new(options: &UpstreamOptions) -> Result<Self, reqwest::Error> {
        let client = base_client_builder(options).build()?;
        Ok(Self {
            client,
            url: options.request_url(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Upstream for HttpUpstream {
    fn call(&self) -> impl Future<Output = Result<i64, UpstreamError>> + Send {
        let request = self.client.get(self.url.clone());
        async move {
            let response = request.send().await.map_err(UpstreamError::Transport)?;

            let status = response.status();
            if status != StatusCode::OK {
                return Err(UpstreamError::Status(status));
            }

            let body = response.bytes().await.map_err(UpstreamError::Transport)?;
            if body.len() > MAX_PAYLOAD_BYTES {
                return Err(UpstreamError::PayloadTooLarge { bytes: body.len() });
            }

            let payload: SleepResponse =
                serde_json::from_slice(&body).map_err(UpstreamError::Payload)?;
            tracing::trace!(time = payload.time, "Upstream responded");
            Ok(payload.time)
        }
    }
}
