//! Adaptive speculative retry.
//!
//! One attempt runs alone until it fails or the grace period passes. Then, if
//! the deadline still allows, two more attempts join it under the same
//! deadline. The first success from any of them wins.

use std::pin::pin;

use fanout_types::AggregateError;
use fanout_upstream::Upstream;
use tokio::time::sleep;

use super::{Event, Request, SPECULATION_GRACE, SPECULATIVE_WAVE};
use crate::collector::Observed;

#[derive(Debug, Clone, Copy)]
enum Trigger {
    FirstFailed,
    GraceElapsed,
}

pub(super) async fn run<U: Upstream>(
    request: &mut Request<U>,
) -> Result<Vec<i64>, AggregateError> {
    request.launch(1);

    let mut grace = pin!(sleep(SPECULATION_GRACE));
    let trigger = tokio::select! {
        biased;
        event = request.next_event() => match event {
            Event::Arrived(Observed::Success(value)) => return Ok(finish(request, value)),
            Event::Arrived(Observed::Failure) => Trigger::FirstFailed,
            Event::DeadlineElapsed => return Err(request.deadline_exceeded()),
        },
        () = &mut grace => Trigger::GraceElapsed,
    };

    if request.scope.is_done() {
        tracing::debug!(?trigger, "Deadline already elapsed, not speculating");
    } else {
        tracing::debug!(
            ?trigger,
            remaining_ms = request.scope.remaining().as_millis() as u64,
            "Launching speculative attempts"
        );
        request.launch(SPECULATIVE_WAVE);
    }

    loop {
        match request.next_event().await {
            Event::Arrived(Observed::Success(value)) => return Ok(finish(request, value)),
            Event::Arrived(Observed::Failure) => {}
            Event::DeadlineElapsed => return Err(request.deadline_exceeded()),
        }
    }
}

fn finish<U: Upstream>(request: &mut Request<U>, value: i64) -> Vec<i64> {
    request.collector.close();
    vec![value]
}
