use std::fmt;
use std::time::Duration;

use crate::error::AggregateError;

/// Smallest accepted request timeout, inclusive.
pub const MIN_TIMEOUT_MS: u64 = 100;
/// Largest accepted request timeout, inclusive.
pub const MAX_TIMEOUT_MS: u64 = 5000;
/// Timeout used when the caller supplies none, or supplies something that is not an integer.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// A request timeout guaranteed to lie within `[MIN_TIMEOUT_MS, MAX_TIMEOUT_MS]`.
///
/// Construction is the only validation point, so an out-of-range timeout can
/// never reach the deadline controller or launch an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timeout(Duration);

impl Timeout {
    /// Validate a timeout given in milliseconds.
    ///
    /// Accepts signed input so negative values from untrusted sources are
    /// reported as invalid rather than wrapped.
    pub fn from_millis(ms: i64) -> Result<Self, AggregateError> {
        match u64::try_from(ms) {
            Ok(value) if (MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&value) => {
                Ok(Self(Duration::from_millis(value)))
            }
            _ => Err(AggregateError::InvalidTimeout { millis: ms }),
        }
    }

    /// Parse a raw textual timeout the way the query surface does.
    ///
    /// Missing, empty or non-integer input falls back to [`DEFAULT_TIMEOUT_MS`];
    /// integers are then validated against the bounds.
    pub fn parse_lenient(raw: Option<&str>) -> Result<Self, AggregateError> {
        let millis = raw
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS as i64);
        Self::from_millis(millis)
    }

    #[must_use]
    pub const fn as_duration(self) -> Duration {
        self.0
    }

    #[must_use]
    pub fn as_millis(self) -> u64 {
        self.0.as_millis() as u64
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.as_millis())
    }
}
