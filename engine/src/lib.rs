//! Speculative fan-out aggregation over a slow, unreliable upstream.
//!
//! # Architecture
//!
//! A request flows through four layers, leaf first:
//!
//! | Layer | Module | Role |
//! |-------|--------|------|
//! | Upstream caller | `attempt` | One spawned task per call; reports at most once |
//! | Result collector | [`Collector`] | Bounded, non-blocking sink read by the policy |
//! | Deadline controller | [`DeadlineScope`] | Cancellation scope derived from the timeout |
//! | Aggregation policy | `policy` | Decides when to stop and what to return |
//!
//! ```text
//! aggregate(policy, timeout)
//!   -> DeadlineScope::open (child of the shutdown token)
//!   -> policy launches attempts -> each offers into the Collector
//!   -> policy observes arrivals / deadline -> Ok(values) | Err(AggregateError)
//!   -> scope dropped: every attempt still running is cancelled
//! ```
//!
//! # Shutdown
//!
//! [`Aggregator::shutdown`] cancels every open scope at once and waits for all
//! attempt tasks to wind down. Requests still in flight observe the
//! cancellation exactly like an expired deadline.

mod attempt;
mod collector;
mod deadline;
mod policy;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use uuid::Uuid;

pub use collector::{AttemptOutcome, Collector, Observed, OutcomeSink};
pub use deadline::{DeadlineScope, ScopeHandle};
pub use fanout_types::{
    AggregateError, AggregateResponse, AttemptIndex, FailureKind, MAX_ATTEMPTS, PolicyKind, Timeout,
};
pub use fanout_upstream::{self, HttpUpstream, Upstream, UpstreamError, UpstreamOptions};

use crate::attempt::Launcher;
use crate::policy::Request;

/// Runs requests against one upstream. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct Aggregator<U> {
    upstream: Arc<U>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl<U: Upstream> Aggregator<U> {
    #[must_use]
    pub fn new(upstream: U) -> Self {
        Self::from_arc(Arc::new(upstream))
    }

    #[must_use]
    pub fn from_arc(upstream: Arc<U>) -> Self {
        Self {
            upstream,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Validate a raw millisecond timeout, then run the request.
    ///
    /// An out-of-range timeout is rejected before anything is launched.
    pub async fn aggregate_millis(
        &self,
        policy: PolicyKind,
        timeout_ms: i64,
    ) -> Result<Vec<i64>, AggregateError> {
        let timeout = Timeout::from_millis(timeout_ms).inspect_err(|err| {
            tracing::info!(policy = %policy, error = %err, "Rejected request");
        })?;
        self.aggregate(policy, timeout).await
    }

    /// Run one request under `policy`, bounded by `timeout`.
    ///
    /// Produces either the collected values or exactly one categorized failure.
    /// Dropping the returned future cancels the request's attempts.
    pub async fn aggregate(
        &self,
        policy: PolicyKind,
        timeout: Timeout,
    ) -> Result<Vec<i64>, AggregateError> {
        let span = tracing::info_span!(
            "request",
            request = %Uuid::new_v4(),
            policy = %policy,
            timeout_ms = timeout.as_millis(),
        );
        self.run_request(policy, timeout).instrument(span).await
    }

    async fn run_request(
        &self,
        policy: PolicyKind,
        timeout: Timeout,
    ) -> Result<Vec<i64>, AggregateError> {
        let started = Instant::now();
        let scope = DeadlineScope::open(&self.shutdown, timeout);
        let collector = Collector::with_capacity(MAX_ATTEMPTS);
        let launcher = Launcher::new(
            Arc::clone(&self.upstream),
            scope.handle(),
            collector.sink(),
            self.tracker.clone(),
        );
        let mut request = Request::new(launcher, collector, scope.handle(), timeout);

        let result = policy::run(policy, &mut request).await;
        let launched = request.launched();
        let interrupted = scope.handle().is_cancelled();
        drop(request);
        scope.finish();

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(values) => tracing::info!(
                elapsed_ms,
                launched,
                returned = values.len(),
                "Request succeeded"
            ),
            Err(err) => tracing::info!(
                elapsed_ms,
                launched,
                interrupted,
                kind = err.kind().as_str(),
                "Request failed"
            ),
        }
        result
    }

    /// Token whose cancellation ends every open scope. Used by signal handlers.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Attempt tasks still running, across all requests.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel every in-flight request and wait for its attempts to finish.
    pub async fn shutdown(&self) {
        tracing::info!(in_flight = self.tracker.len(), "Shutting down aggregator");
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
