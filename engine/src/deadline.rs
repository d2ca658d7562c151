//! Deadline controller: one bounded cancellation scope per request.
//!
//! A scope ends when its deadline passes, when the owning policy finishes, or
//! when the process-wide shutdown token is cancelled, whichever comes first.
//! Attempts only ever see a [`ScopeHandle`]; the [`DeadlineScope`] itself stays
//! with the request and cancels on drop, so every exit path releases in-flight
//! work.

use std::time::Duration;

use fanout_types::Timeout;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Owning side of a request's cancellation scope.
#[derive(Debug)]
pub struct DeadlineScope {
    handle: ScopeHandle,
    _cancel_on_drop: DropGuard,
}

impl DeadlineScope {
    /// Open a scope expiring `timeout` from now, nested under `parent`.
    #[must_use]
    pub fn open(parent: &CancellationToken, timeout: Timeout) -> Self {
        let token = parent.child_token();
        let handle = ScopeHandle {
            token: token.clone(),
            deadline: Instant::now() + timeout.as_duration(),
        };
        Self {
            handle,
            _cancel_on_drop: token.drop_guard(),
        }
    }

    #[must_use]
    pub fn handle(&self) -> ScopeHandle {
        self.handle.clone()
    }

    /// End the scope, cancelling every attempt still running under it.
    pub fn finish(self) {
        drop(self._cancel_on_drop);
    }
}

/// Read-only view of a scope, cloned into every attempt.
#[derive(Debug, Clone)]
pub struct ScopeHandle {
    token: CancellationToken,
    deadline: Instant,
}

impl ScopeHandle {
    /// Resolves once the scope has ended for any reason.
    pub async fn done(&self) {
        tokio::select! {
            biased;
            () = self.token.cancelled() => {}
            () = sleep_until(self.deadline) => {}
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// True when the scope was ended by cancellation rather than by its deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[cfg(test)]
    pub(crate) const fn deadline(&self) -> Instant {
        self.deadline
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}
