//! Synthetic traffic generators.
//!
//! - `latency`: randomized delay for the success path
//! - `failure`: nine-way failure taxonomy for the failure path

pub mod failure;
pub mod latency;

pub use failure::{FailureGenerator, FailureOutcome, SimulatedFailure, UnhandledFault};
pub use latency::LatencyGenerator;
