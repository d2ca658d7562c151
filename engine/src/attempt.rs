//! Upstream caller: one spawned task per attempt.

use std::sync::Arc;

use fanout_types::AttemptIndex;
use fanout_upstream::Upstream;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;

use crate::collector::{AttemptOutcome, OutcomeSink};
use crate::deadline::ScopeHandle;

/// One outbound call. Consumed by [`Attempt::run`], so it reports at most once.
#[derive(Debug)]
struct Attempt {
    index: AttemptIndex,
    started: Instant,
}

impl Attempt {
    async fn run<U: Upstream>(self, upstream: Arc<U>, scope: ScopeHandle, sink: OutcomeSink) {
        let result = tokio::select! {
            biased;
            result = upstream.call() => result,
            () = scope.done() => {
                tracing::debug!(
                    attempt = %self.index,
                    elapsed_ms = self.started.elapsed().as_millis() as u64,
                    "Attempt abandoned"
                );
                return;
            }
        };

        let outcome = match result {
            Ok(value) => AttemptOutcome::Success(value),
            Err(err) => AttemptOutcome::Failure(err),
        };

        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        if sink.offer(self.index, outcome) {
            tracing::debug!(attempt = %self.index, elapsed_ms, "Attempt reported");
        } else {
            tracing::debug!(attempt = %self.index, elapsed_ms, "Attempt outcome discarded");
        }
    }
}

/// Spawns attempts for one request, numbering them in launch order.
#[derive(Debug)]
pub(crate) struct Launcher<U> {
    upstream: Arc<U>,
    scope: ScopeHandle,
    sink: OutcomeSink,
    tracker: TaskTracker,
    next_index: AttemptIndex,
}

impl<U: Upstream> Launcher<U> {
    pub(crate) fn new(
        upstream: Arc<U>,
        scope: ScopeHandle,
        sink: OutcomeSink,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            upstream,
            scope,
            sink,
            tracker,
            next_index: AttemptIndex::new(0),
        }
    }

    /// Launch `count` attempts concurrently under this request's scope.
    pub(crate) fn launch(&mut self, count: usize) {
        for _ in 0..count {
            let attempt = Attempt {
                index: self.next_index,
                started: Instant::now(),
            };
            self.next_index = self.next_index.next();
            tracing::debug!(attempt = %attempt.index, "Launching attempt");

            self.tracker.spawn(attempt.run(
                Arc::clone(&self.upstream),
                self.scope.clone(),
                self.sink.clone(),
            ));
        }
    }

    /// Number of attempts launched so far.
    pub(crate) fn launched(&self) -> usize {
        self.next_index.value() as usize
    }
}
