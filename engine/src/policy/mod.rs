//! Aggregation policies.
//!
//! Each policy is a single-consumer decision loop over one [`Request`]. All of
//! them share the same shape: launch attempts, wait on the next collector event
//! or the deadline (never polling), and stop at the first terminal decision.
//! An outcome produced on the same tick as the deadline is observed before
//! the deadline.

mod collect_within_deadline;
mod first_success;
mod smart;
mod wait_for_all;

use std::time::Duration;

use fanout_types::{AggregateError, PolicyKind, Timeout};
use fanout_upstream::Upstream;
use tokio::task;

use crate::attempt::Launcher;
use crate::collector::{Collector, Observed};
use crate::deadline::ScopeHandle;

/// Attempts launched up front by the fixed fan-out policies.
pub(crate) const FAN_OUT: usize = 3;

/// Attempts added by the adaptive policy once it decides to speculate.
pub(crate) const SPECULATIVE_WAVE: usize = 2;

/// How long the adaptive policy lets its first attempt run alone.
pub(crate) const SPECULATION_GRACE: Duration = Duration::from_millis(200);

/// Run `policy` to its terminal decision.
pub(crate) async fn run<U: Upstream>(
    policy: PolicyKind,
    request: &mut Request<U>,
) -> Result<Vec<i64>, AggregateError> {
    match policy {
        PolicyKind::WaitForAll => wait_for_all::run(request).await,
        PolicyKind::FirstSuccess => first_success::run(request).await,
        PolicyKind::CollectWithinDeadline => collect_within_deadline::run(request).await,
        PolicyKind::Smart => smart::run(request).await,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Arrived(Observed),
    DeadlineElapsed,
}

/// Everything one request owns while its policy runs.
#[derive(Debug)]
pub(crate) struct Request<U> {
    launcher: Launcher<U>,
    collector: Collector,
    scope: ScopeHandle,
    timeout: Timeout,
}

impl<U: Upstream> Request<U> {
    pub(crate) fn new(
        launcher: Launcher<U>,
        collector: Collector,
        scope: ScopeHandle,
        timeout: Timeout,
    ) -> Self {
        Self {
            launcher,
            collector,
            scope,
            timeout,
        }
    }

    fn launch(&mut self, count: usize) {
        self.launcher.launch(count);
    }

    pub(crate) fn launched(&self) -> usize {
        self.launcher.launched()
    }

    /// Wait for the next outcome or the end of the scope.
    ///
    /// Once the scope has ended, attempts woken on the same tick get one turn
    /// to report before the deadline is declared; anything they buffered is
    /// returned first. Cancel-safe.
    async fn next_event(&mut self) -> Event {
        tokio::select! {
            biased;
            observed = self.collector.next() => return Event::Arrived(observed),
            () = self.scope.done() => {}
        }

        task::yield_now().await;
        match self.collector.try_next() {
            Some(observed) => Event::Arrived(observed),
            None => Event::DeadlineElapsed,
        }
    }

    fn deadline_exceeded(&self) -> AggregateError {
        AggregateError::DeadlineExceeded {
            timeout_ms: self.timeout.as_millis(),
        }
    }

    /// Stop accepting outcomes and hand back the successes recorded so far.
    fn take_values(&mut self) -> Vec<i64> {
        self.collector.close();
        self.collector.take_values()
    }
}
