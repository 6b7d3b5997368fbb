//! Uniform latency model for the success path.

use rand::Rng;

use crate::error::{FaultlineError, Result};

/// Lower bound of the default delay window (ms).
pub const DEFAULT_MIN_MS: u64 = 100;
/// Width of the default delay window (ms). Delays fall in `[100, 2100)`.
pub const DEFAULT_SPREAD_MS: u64 = 2000;

/// Draws delays uniformly from `[min_ms, min_ms + spread_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyGenerator {
    min_ms: u64,
    spread_ms: u64,
}

impl Default for LatencyGenerator {
    fn default() -> Self {
        Self {
            min_ms: DEFAULT_MIN_MS,
            spread_ms: DEFAULT_SPREAD_MS,
        }
    }
}

impl LatencyGenerator {
    pub fn new(min_ms: u64, spread_ms: u64) -> Result<Self> {
        if spread_ms == 0 {
            return Err(FaultlineError::BadRequest(
                "latency spread_ms must be greater than 0".into(),
            ));
        }
        min_ms
            .checked_add(spread_ms)
            .ok_or_else(|| FaultlineError::BadRequest("latency window overflows u64".into()))?;
        Ok(Self { min_ms, spread_ms })
    }

    /// Smallest delay this generator can return.
    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    /// Exclusive upper bound of the delay window.
    pub fn max_ms(&self) -> u64 {
        self.min_ms + self.spread_ms
    }

    /// Next delay in milliseconds, drawn from the thread-local RNG.
    pub fn next_delay(&self) -> u64 {
        self.next_delay_with(&mut rand::thread_rng())
    }

    /// Next delay in milliseconds, drawn from `rng`.
    pub fn next_delay_with<R: Rng>(&self, rng: &mut R) -> u64 {
        self.min_ms + rng.gen_range(0..self.spread_ms)
    }
}
