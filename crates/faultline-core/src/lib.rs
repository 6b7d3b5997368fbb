//! faultline core: transport-agnostic synthetic traffic primitives and errors.
//!
//! This crate defines the failure taxonomy, the latency model and the error
//! surface shared by the server and the facade crate. It carries no HTTP or
//! runtime dependencies so the generators can be exercised in plain unit tests.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `FaultlineError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod synthetic;

/// Shared result type.
pub use error::{FaultlineError, Result};
pub use synthetic::{
    FailureGenerator, FailureOutcome, LatencyGenerator, SimulatedFailure, UnhandledFault,
};
