//! Counter delta computation.
//!
//! Kernel interface counters only ever grow, but they wrap when they reach
//! the maximum of their native word and restart at zero when the host
//! reboots. [`delta`] turns two raw readings into the number of units that
//! really passed between them.

use crate::error::CheckError;

/// Largest value a kernel interface counter can hold on this target.
///
/// Counters are `unsigned long` in the kernel, i.e. the native word:
/// `2^32 - 1` on 32-bit hosts and `2^64 - 1` on 64-bit hosts.
pub const MAX_COUNTER: u64 = usize::MAX as u64;

/// Computes counter deltas for a given counter width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaCalculator {
    max_counter: u64,
}

impl Default for DeltaCalculator {
    fn default() -> Self {
        Self::native()
    }
}

impl DeltaCalculator {
    /// Calculator for the counter width of the running host.
    pub const fn native() -> Self {
        Self::with_max_counter(MAX_COUNTER)
    }

    /// Calculator wrapping at an explicit maximum value.
    pub const fn with_max_counter(max_counter: u64) -> Self {
        Self { max_counter }
    }

    /// Returns the value at which counters wrap.
    pub fn max_counter(&self) -> u64 {
        self.max_counter
    }

    /// Difference between `value1` sampled at `uptime1` and `value2` sampled
    /// at `uptime2`.
    ///
    /// Rules, in priority order:
    ///
    /// 1. The uptime went backwards: the host rebooted and `value1` belongs
    ///    to a previous boot, so `value2` is the best approximation.
    /// 2. The counter went backwards: it wrapped once, and the tick that
    ///    crossed the boundary counts as well (`+ 1`).
    /// 3. Otherwise the plain difference.
    ///
    /// Fails with [`CheckError::NonNumericInput`] when an uptime is NaN or
    /// infinite.
    pub fn delta(
        &self,
        value1: u64,
        uptime1: f64,
        value2: u64,
        uptime2: f64,
    ) -> Result<u64, CheckError> {
        for uptime in [uptime1, uptime2] {
            if !uptime.is_finite() {
                return Err(CheckError::NonNumericInput(format!("uptime {}", uptime)));
            }
        }

        if uptime2 < uptime1 {
            return Ok(value2);
        }

        if value1 > value2 {
            // Saturating: a state file written on a wider host may hold
            // values above our own maximum.
            return Ok(self
                .max_counter
                .saturating_sub(value1)
                .saturating_add(value2)
                .saturating_add(1));
        }

        Ok(value2 - value1)
    }
}

/// [`DeltaCalculator::delta`] for the native counter width.
pub fn delta(value1: u64, uptime1: f64, value2: u64, uptime2: f64) -> Result<u64, CheckError> {
    DeltaCalculator::native().delta(value1, uptime1, value2, uptime2)
}
