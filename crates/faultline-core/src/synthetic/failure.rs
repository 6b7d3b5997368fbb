//! Failure taxonomy for the failure path.
//!
//! Every draw picks one of nine outcomes with equal probability. Eight of
//! them resolve to a plain HTTP error (status + message, optionally delayed).
//! The ninth resolves to `Err(UnhandledFault)`: the generator does not catch
//! it, the HTTP handler boundary converts it to a generic 500.

use std::time::Duration;

use rand::Rng;
use thiserror::Error;

/// Delay applied before answering `GatewayTimeout` (ms).
pub const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 3000;

/// One of the nine synthetic failure modes, in draw-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureOutcome {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    UnhandledException,
}

impl FailureOutcome {
    /// All outcomes; position equals the draw index.
    pub const ALL: [FailureOutcome; 9] = [
        FailureOutcome::BadRequest,
        FailureOutcome::Unauthorized,
        FailureOutcome::Forbidden,
        FailureOutcome::NotFound,
        FailureOutcome::InternalServerError,
        FailureOutcome::BadGateway,
        FailureOutcome::ServiceUnavailable,
        FailureOutcome::GatewayTimeout,
        FailureOutcome::UnhandledException,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable label used in logs and the `outcome` metric label.
    pub fn label(self) -> &'static str {
        match self {
            FailureOutcome::BadRequest => "bad_request",
            FailureOutcome::Unauthorized => "unauthorized",
            FailureOutcome::Forbidden => "forbidden",
            FailureOutcome::NotFound => "not_found",
            FailureOutcome::InternalServerError => "internal_server_error",
            FailureOutcome::BadGateway => "bad_gateway",
            FailureOutcome::ServiceUnavailable => "service_unavailable",
            FailureOutcome::GatewayTimeout => "gateway_timeout",
            FailureOutcome::UnhandledException => "unhandled_exception",
        }
    }

    /// Status and body message, or `None` for the unhandled fault.
    pub fn response(self) -> Option<(u16, &'static str)> {
        match self {
            FailureOutcome::BadRequest => Some((400, "Bad Request")),
            FailureOutcome::Unauthorized => Some((401, "Unauthorized")),
            FailureOutcome::Forbidden => Some((403, "Forbidden")),
            FailureOutcome::NotFound => Some((404, "Resource Not Found")),
            FailureOutcome::InternalServerError => Some((500, "Internal Server Error")),
            FailureOutcome::BadGateway => Some((502, "Bad Gateway")),
            FailureOutcome::ServiceUnavailable => Some((503, "Service Unavailable")),
            FailureOutcome::GatewayTimeout => Some((504, "Gateway Timeout")),
            FailureOutcome::UnhandledException => None,
        }
    }
}

/// A failure that is answered as a normal HTTP error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedFailure {
    pub outcome: FailureOutcome,
    pub status: u16,
    pub error: &'static str,
    /// Suspend this long before answering.
    pub delay: Option<Duration>,
}

/// The simulated unexpected fault (draw index 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("simulated unhandled exception")]
pub struct UnhandledFault;

/// Uniform draw over [`FailureOutcome::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureGenerator {
    gateway_timeout: Duration,
}

impl Default for FailureGenerator {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_GATEWAY_TIMEOUT_MS))
    }
}

impl FailureGenerator {
    pub fn new(gateway_timeout: Duration) -> Self {
        Self { gateway_timeout }
    }

    pub fn gateway_timeout(&self) -> Duration {
        self.gateway_timeout
    }

    /// Next outcome, drawn from the thread-local RNG.
    pub fn next_outcome(&self) -> FailureOutcome {
        self.next_outcome_with(&mut rand::thread_rng())
    }

    /// Next outcome, drawn from `rng`.
    pub fn next_outcome_with<R: Rng>(&self, rng: &mut R) -> FailureOutcome {
        let idx = rng.gen_range(0..FailureOutcome::ALL.len());
        FailureOutcome::ALL[idx]
    }

    /// Map an outcome to its response. `UnhandledException` propagates as `Err`.
    pub fn resolve(&self, outcome: FailureOutcome) -> Result<SimulatedFailure, UnhandledFault> {
        let (status, error) = outcome.response().ok_or(UnhandledFault)?;
        let delay = match outcome {
            FailureOutcome::GatewayTimeout => Some(self.gateway_timeout),
            _ => None,
        };
        Ok(SimulatedFailure {
            outcome,
            status,
            error,
            delay,
        })
    }
}
