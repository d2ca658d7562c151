//! First-success: three attempts, the first value wins.

use fanout_types::AggregateError;
use fanout_upstream::Upstream;

use super::{Event, FAN_OUT, Request};
use crate::collector::Observed;

pub(super) async fn run<U: Upstream>(
    request: &mut Request<U>,
) -> Result<Vec<i64>, AggregateError> {
    request.launch(FAN_OUT);

    loop {
        match request.next_event().await {
            Event::Arrived(Observed::Success(value)) => {
                request.collector.close();
                return Ok(vec![value]);
            }
            Event::Arrived(Observed::Failure) => {
                if request.collector.failures() >= FAN_OUT {
                    return Err(AggregateError::AllAttemptsFailed { attempts: FAN_OUT });
                }
            }
            Event::DeadlineElapsed => return Err(request.deadline_exceeded()),
        }
    }
}
