use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The aggregation strategy a request runs under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum PolicyKind {
    /// Three concurrent attempts; return every success once all three have finished.
    WaitForAll,
    /// Three concurrent attempts; return the first success.
    #[default]
    FirstSuccess,
    /// Three concurrent attempts; return whatever succeeded by the deadline.
    CollectWithinDeadline,
    /// One attempt, plus two speculative ones if it fails or is slow.
    Smart,
}

impl PolicyKind {
    pub const ALL: [Self; 4] = [
        Self::WaitForAll,
        Self::FirstSuccess,
        Self::CollectWithinDeadline,
        Self::Smart,
    ];

    /// Short name used on the command line and in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WaitForAll => "all",
            Self::FirstSuccess => "first",
            Self::CollectWithinDeadline => "collect",
            Self::Smart => "smart",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown policy '{0}' (expected one of: all, first, collect, smart)")]
pub struct UnknownPolicyError(String);

impl FromStr for PolicyKind {
    type Err = UnknownPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "wait-for-all" | "wait_for_all" => Ok(Self::WaitForAll),
            "first" | "first-success" | "first_success" => Ok(Self::FirstSuccess),
            "collect" | "within-timeout" | "collect-within-deadline"
            | "collect_within_deadline" => Ok(Self::CollectWithinDeadline),
            "smart" | "adaptive" => Ok(Self::Smart),
            _ => Err(UnknownPolicyError(s.to_string())),
        }
    }
}

impl TryFrom<String> for PolicyKind {
    type Error = UnknownPolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
