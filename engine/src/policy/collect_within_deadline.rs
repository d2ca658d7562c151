//! Collect-within-deadline: three attempts, whatever succeeded by the deadline.
//!
//! Failures are never counted here. A deadline with nothing collected is still
//! a success with an empty value set.

use fanout_types::AggregateError;
use fanout_upstream::Upstream;

use super::{Event, FAN_OUT, Request};

pub(super) async fn run<U: Upstream>(
    request: &mut Request<U>,
) -> Result<Vec<i64>, AggregateError> {
    request.launch(FAN_OUT);

    while request.collector.successes() < FAN_OUT {
        if request.next_event().await == Event::DeadlineElapsed {
            break;
        }
    }

    Ok(request.take_values())
}
