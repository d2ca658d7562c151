use serde::Serialize;
use thiserror::Error;

use crate::timeout::{MAX_TIMEOUT_MS, MIN_TIMEOUT_MS};

/// The only failures a request can surface to its caller.
///
/// Individual attempt failures never appear here; policies absorb them and
/// report at most one of these per request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// Rejected before any attempt was launched.
    #[error(
        "incorrect value for timeout specified ({millis}), it must be {MIN_TIMEOUT_MS} <= timeout <= {MAX_TIMEOUT_MS}"
    )]
    InvalidTimeout { millis: i64 },
    /// Every launched attempt failed before any success arrived.
    #[error("all {attempts} attempts failed")]
    AllAttemptsFailed { attempts: usize },
    /// The deadline elapsed before the policy's success condition was met.
    #[error("deadline of {timeout_ms}ms exceeded")]
    DeadlineExceeded { timeout_ms: u64 },
}

impl AggregateError {
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidTimeout { .. } => FailureKind::InvalidTimeout,
            Self::AllAttemptsFailed { .. } => FailureKind::AllAttemptsFailed,
            Self::DeadlineExceeded { .. } => FailureKind::DeadlineExceeded,
        }
    }
}

/// Stable machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidTimeout,
    AllAttemptsFailed,
    DeadlineExceeded,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidTimeout => "invalid_timeout",
            Self::AllAttemptsFailed => "all_attempts_failed",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }

    /// Validation failures happen before launch and are the caller's fault.
    #[must_use]
    pub const fn is_validation(self) -> bool {
        matches!(self, Self::InvalidTimeout)
    }
}
