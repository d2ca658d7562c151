//! Scripted in-memory upstream for driving policies on virtual time.

use std::collections::VecDeque;
use std::future::{Future, pending};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fanout_upstream::{StatusCode, Upstream, UpstreamError};
use tokio::time::sleep;

/// Latency and result of one scripted call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Step {
    latency: Duration,
    succeed: bool,
}

impl Step {
    /// Succeeds after `ms`, returning `ms` like the real upstream does.
    pub(crate) fn ok(ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(ms),
            succeed: true,
        }
    }

    /// Fails with a 500 after `ms`.
    pub(crate) fn fail(ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(ms),
            succeed: false,
        }
    }
}

/// Hands out steps in call order. Calls beyond the script never resolve.
#[derive(Debug, Default)]
pub(crate) struct ScriptedUpstream {
    script: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl ScriptedUpstream {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Calls started.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that ran to completion without being dropped.
    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl Upstream for ScriptedUpstream {
    fn call(&self) -> impl Future<Output = Result<i64, UpstreamError>> + Send {
        let step = self.script.lock().unwrap().pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        async move {
            let Some(step) = step else {
                return pending().await;
            };
            sleep(step.latency).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            if step.succeed {
                Ok(step.latency.as_millis() as i64)
            } else {
                Err(UpstreamError::Status(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }
}
