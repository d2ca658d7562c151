//! Core domain types for fanout.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application: the upstream client,
//! the aggregation engine and the command-line front end.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod error;
mod ids;
mod policy;
mod response;
mod timeout;

pub use error::{AggregateError, FailureKind};
pub use ids::AttemptIndex;
pub use policy::{PolicyKind, UnknownPolicyError};
pub use response::AggregateResponse;
pub use timeout::{DEFAULT_TIMEOUT_MS, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS, Timeout};

/// Maximum number of attempts any single request may launch.
///
/// Every policy stays within this ceiling: three concurrent attempts, or one
/// attempt followed by a speculative wave of two.
pub const MAX_ATTEMPTS: usize = 3;
