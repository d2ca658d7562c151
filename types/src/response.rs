use serde::Serialize;

use crate::error::{AggregateError, FailureKind};

/// Result document handed to whatever surface serializes it.
///
/// Exactly one shape is produced per request: the collected values, or a
/// single categorized failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AggregateResponse {
    Times {
        times: Vec<i64>,
    },
    Failure {
        error: FailureKind,
        message: String,
    },
}

impl AggregateResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Times { .. })
    }
}

impl From<Result<Vec<i64>, AggregateError>> for AggregateResponse {
    fn from(result: Result<Vec<i64>, AggregateError>) -> Self {
        match result {
            Ok(times) => Self::Times { times },
            Err(err) => Self::Failure {
                error: err.kind(),
                message: err.to_string(),
            },
        }
    }
}
