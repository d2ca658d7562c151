//! Wait-for-all: three attempts, every success once all three have finished.

use fanout_types::AggregateError;
use fanout_upstream::Upstream;

use super::{Event, FAN_OUT, Request};

pub(super) async fn run<U: Upstream>(
    request: &mut Request<U>,
) -> Result<Vec<i64>, AggregateError> {
    request.launch(FAN_OUT);

    let mut finished = 0;
    while finished < FAN_OUT {
        match request.next_event().await {
            Event::Arrived(_) => finished += 1,
            Event::DeadlineElapsed => return Err(request.deadline_exceeded()),
        }
    }

    if request.collector.successes() == 0 {
        return Err(AggregateError::AllAttemptsFailed { attempts: FAN_OUT });
    }
    Ok(request.take_values())
}
