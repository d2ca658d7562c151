//! Result collector: the only state shared between attempt tasks and the policy loop.
//!
//! Producers hold an [`OutcomeSink`] and write at most once each; the single
//! consumer (the active policy) reads through [`Collector::next`]. The buffer is
//! sized to the attempt ceiling, so a write never waits for the reader.

use std::future::pending;
use std::mem;

use fanout_types::AttemptIndex;
use fanout_upstream::UpstreamError;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// What one attempt reports. Cancelled attempts report nothing at all.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(i64),
    Failure(UpstreamError),
}

#[derive(Debug)]
struct Arrival {
    attempt: AttemptIndex,
    outcome: AttemptOutcome,
}

/// An outcome as seen by the policy, after it has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observed {
    Success(i64),
    Failure,
}

/// Producer half handed to every attempt.
#[derive(Debug, Clone)]
pub struct OutcomeSink {
    tx: mpsc::Sender<Arrival>,
}

impl OutcomeSink {
    /// Offer an outcome without blocking.
    ///
    /// Returns `false` when the collector has stopped accepting writes (the
    /// request already concluded). Callers treat that as a no-op.
    pub fn offer(&self, attempt: AttemptIndex, outcome: AttemptOutcome) -> bool {
        match self.tx.try_send(Arrival { attempt, outcome }) {
            Ok(()) => true,
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(%attempt, "Collector closed, dropping outcome");
                false
            }
            Err(TrySendError::Full(_)) => {
                // Capacity equals the attempt ceiling; a full buffer means an
                // attempt wrote twice or more attempts were launched than sized for.
                tracing::warn!(%attempt, "Collector full, dropping outcome");
                false
            }
        }
    }
}

/// Consumer half: accumulates successes in arrival order and counts failures.
#[derive(Debug)]
pub struct Collector {
    rx: mpsc::Receiver<Arrival>,
    tx: mpsc::Sender<Arrival>,
    values: Vec<i64>,
    failures: usize,
}

impl Collector {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            rx,
            tx,
            values: Vec::with_capacity(capacity),
            failures: 0,
        }
    }

    #[must_use]
    pub fn sink(&self) -> OutcomeSink {
        OutcomeSink {
            tx: self.tx.clone(),
        }
    }

    /// Wait for the next outcome and record it.
    ///
    /// Cancel-safe. Once closed and drained this never resolves, leaving the
    /// decision to whatever else the caller is waiting on.
    pub async fn next(&mut self) -> Observed {
        match self.rx.recv().await {
            Some(arrival) => self.record(arrival),
            None => pending().await,
        }
    }

    /// Record an outcome that is already buffered, if any.
    pub fn try_next(&mut self) -> Option<Observed> {
        let arrival = self.rx.try_recv().ok()?;
        Some(self.record(arrival))
    }

    /// Stop accepting writes. Outcomes already buffered can still be read.
    pub fn close(&mut self) {
        self.rx.close();
    }

    #[cfg(test)]
    pub(crate) fn values(&self) -> &[i64] {
        &self.values
    }

    #[must_use]
    pub fn successes(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Move the recorded successes out, leaving the collector empty.
    pub fn take_values(&mut self) -> Vec<i64> {
        mem::take(&mut self.values)
    }

    fn record(&mut self, arrival: Arrival) -> Observed {
        match arrival.outcome {
            AttemptOutcome::Success(value) => {
                tracing::debug!(attempt = %arrival.attempt, value, "Attempt succeeded");
                self.values.push(value);
                Observed::Success(value)
            }
            AttemptOutcome::Failure(err) => {
                tracing::debug!(attempt = %arrival.attempt, error = %err, "Attempt failed");
                self.failures += 1;
                Observed::Failure
            }
        }
    }
}
